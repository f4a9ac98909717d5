//! Run report module
//!
//! A serializable summary of one simulation run, printable for humans and
//! optionally persisted as JSON.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::SwarmError;

/// Files one peer completed during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerCompletion {
    /// Peer id
    pub peer: u32,
    /// Completed file names, in completion order
    pub files: Vec<String>,
    /// Segments this peer served to others
    pub segments_served: u64,
}

/// Summary of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of peers
    pub peers: u32,
    /// Number of files in the swarm catalog
    pub files: u32,
    /// Peer-list queries the tracker answered
    pub queries_served: u64,
    /// Individual segment acquisitions the tracker recorded
    pub segments_recorded: u64,
    /// Whole-file completions the tracker recorded
    pub files_completed: u64,
    /// Per-peer completion detail
    pub completions: Vec<PeerCompletion>,
    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Write the report as pretty-printed JSON
    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).await.map_err(|e| {
            SwarmError::storage_error_full(
                "Failed to write run report",
                path.display().to_string(),
                e.to_string(),
            )
        })?;
        info!("Run report written to {}", path.display());
        Ok(())
    }

    /// Print a human-readable summary
    pub fn print_summary(&self) {
        println!("Run summary:");
        println!("  Peers: {}", self.peers);
        println!("  Files: {}", self.files);
        println!("  Peer-list queries: {}", self.queries_served);
        println!("  Segments recorded: {}", self.segments_recorded);
        println!("  Files completed: {}", self.files_completed);
        println!("  Elapsed: {} ms", self.elapsed_ms);
        for completion in &self.completions {
            println!(
                "  peer {}: completed [{}], served {} segments",
                completion.peer,
                completion.files.join(", "),
                completion.segments_served
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport {
            peers: 2,
            files: 1,
            queries_served: 5,
            segments_recorded: 3,
            files_completed: 1,
            completions: vec![PeerCompletion {
                peer: 2,
                files: vec!["file1".to_string()],
                segments_served: 0,
            }],
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.peers, 2);
        assert_eq!(parsed.completions.len(), 1);
        assert_eq!(parsed.completions[0].files, vec!["file1"]);
    }

    #[tokio::test]
    async fn test_write_json() {
        let path = std::env::temp_dir().join(format!("swarm-sim-report-{}.json", std::process::id()));
        sample_report().write_json(&path).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("\"queries_served\": 5"));
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
