//! Output sinks
//!
//! Where completed downloads go. The sink is a trait seam so the simulation
//! can write real files while tests capture output in memory.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SwarmError;
use crate::protocol::{FileId, ProcessId, SegmentId};
use crate::storage::naming::file_name_for;

/// Destination for a completed file's segment identifiers
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Persist the ordered identifier sequence of one completed file
    async fn write_file(&self, peer: ProcessId, file: FileId, segments: &[SegmentId]) -> Result<()>;
}

/// Writes one `client<peer>_file<k>` text file per completed download
pub struct DirectoryOutput {
    base_path: PathBuf,
}

impl DirectoryOutput {
    /// Create a sink rooted at the given directory
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Output path for one (peer, file) pair
    pub fn output_path(&self, peer: ProcessId, file: FileId) -> PathBuf {
        self.base_path.join(format!("client{}_{}", peer.0, file_name_for(file)))
    }
}

#[async_trait]
impl OutputSink for DirectoryOutput {
    async fn write_file(&self, peer: ProcessId, file: FileId, segments: &[SegmentId]) -> Result<()> {
        if !self.base_path.exists() {
            debug!("Creating output directory: {}", self.base_path.display());
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                SwarmError::storage_error_full(
                    "Failed to create output directory",
                    self.base_path.display().to_string(),
                    e.to_string(),
                )
            })?;
        }

        let path = self.output_path(peer, file);
        let mut contents = String::with_capacity(segments.len() * (crate::protocol::SEGMENT_ID_LEN + 1));
        for segment in segments {
            contents.push_str(segment.as_str());
            contents.push('\n');
        }
        fs::write(&path, contents).await.map_err(|e| {
            SwarmError::storage_error_full(
                "Failed to write output file",
                path.display().to_string(),
                e.to_string(),
            )
        })?;
        info!("{} wrote {} ({} segments) to {}", peer, file, segments.len(), path.display());
        Ok(())
    }
}

/// In-memory sink capturing completed files, for tests
#[derive(Default)]
pub struct MemoryOutput {
    files: Mutex<HashMap<(ProcessId, FileId), Vec<SegmentId>>>,
}

impl MemoryOutput {
    /// Create an empty memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the captured sequence for one (peer, file) pair
    pub async fn get(&self, peer: ProcessId, file: FileId) -> Option<Vec<SegmentId>> {
        self.files.lock().await.get(&(peer, file)).cloned()
    }

    /// Number of completed files captured
    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }

    /// Check whether nothing was captured
    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }
}

#[async_trait]
impl OutputSink for MemoryOutput {
    async fn write_file(&self, peer: ProcessId, file: FileId, segments: &[SegmentId]) -> Result<()> {
        self.files.lock().await.insert((peer, file), segments.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id(fill: u8) -> SegmentId {
        SegmentId::from_bytes(&[fill; crate::protocol::SEGMENT_ID_LEN]).unwrap()
    }

    #[test]
    fn test_output_path_naming() {
        let sink = DirectoryOutput::new(PathBuf::from("/tmp/out"));
        assert_eq!(
            sink.output_path(ProcessId(2), FileId(0)),
            PathBuf::from("/tmp/out/client2_file1")
        );
    }

    #[tokio::test]
    async fn test_directory_output_writes_one_id_per_line() {
        let dir = std::env::temp_dir().join(format!("swarm-sim-output-{}", std::process::id()));
        let sink = DirectoryOutput::new(dir.clone());
        let segments = vec![sample_id(b'a'), sample_id(b'b')];

        sink.write_file(ProcessId(1), FileId(0), &segments).await.unwrap();

        let written = tokio::fs::read_to_string(sink.output_path(ProcessId(1), FileId(0)))
            .await
            .unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], segments[0].as_str());
        assert_eq!(lines[1], segments[1].as_str());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_output_captures_sequences() {
        let sink = MemoryOutput::new();
        assert!(sink.is_empty().await);

        let segments = vec![sample_id(b'x')];
        sink.write_file(ProcessId(1), FileId(2), &segments).await.unwrap();

        assert_eq!(sink.len().await, 1);
        assert_eq!(sink.get(ProcessId(1), FileId(2)).await, Some(segments));
        assert_eq!(sink.get(ProcessId(2), FileId(2)).await, None);
    }
}
