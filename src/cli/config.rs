//! CLI configuration module
//!
//! Resolves and validates the configuration for a simulation run.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::args::CliArgs;
use crate::error::SwarmError;
use crate::protocol::ProcessId;
use crate::storage::input_path;

/// Configuration for one simulation run
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the per-peer input files
    pub input_dir: PathBuf,
    /// Resolved peer count
    pub peers: u32,
    /// Directory for completed-file outputs
    pub output_dir: PathBuf,
    /// Optional JSON run-report path
    pub report: Option<PathBuf>,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let peers = if args.peers > 0 {
            args.peers
        } else {
            detect_peer_count(&args.input_dir)?
        };

        let output_dir = args.output_dir.clone().unwrap_or_else(|| args.input_dir.clone());

        Ok(Self {
            input_dir: args.input_dir.clone(),
            peers,
            output_dir,
            report: args.report.clone(),
            verbose: args.verbose,
            quiet: args.quiet,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.peers == 0 {
            return Err(SwarmError::config_error_with_field("At least one peer required", "peers").into());
        }
        if self.verbose && self.quiet {
            return Err(SwarmError::config_error("Cannot be both verbose and quiet").into());
        }
        if !self.input_dir.is_dir() {
            return Err(SwarmError::config_error_with_field(
                format!("Input directory does not exist: {}", self.input_dir.display()),
                "input_dir",
            )
            .into());
        }
        Ok(())
    }
}

/// Count the consecutive `in<N>.txt` files present in a directory
pub fn detect_peer_count(dir: &Path) -> Result<u32> {
    let mut count = 0u32;
    while input_path(dir, ProcessId(count + 1)).is_file() {
        count += 1;
    }
    debug!("Detected {} peer input files in {}", count, dir.display());
    if count == 0 {
        return Err(SwarmError::config_error_with_field(
            format!("No in<N>.txt files found in {}", dir.display()),
            "input_dir",
        )
        .into());
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("swarm-sim-config-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_detect_peer_count() {
        let dir = test_dir("detect");
        for n in 1..=3 {
            std::fs::write(dir.join(format!("in{}.txt", n)), "0\n0\n").unwrap();
        }
        assert_eq!(detect_peer_count(&dir).unwrap(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_detect_peer_count_empty_dir_fails() {
        let dir = test_dir("empty");
        assert!(detect_peer_count(&dir).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_validate_rejects_verbose_quiet_combination() {
        let dir = test_dir("validate");
        let config = Config {
            input_dir: dir.clone(),
            peers: 1,
            output_dir: dir.clone(),
            report: None,
            verbose: true,
            quiet: true,
        };
        assert!(config.validate().is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_peers() {
        let dir = test_dir("zero");
        let config = Config {
            input_dir: dir.clone(),
            peers: 0,
            output_dir: dir.clone(),
            report: None,
            verbose: false,
            quiet: false,
        };
        assert!(config.validate().is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
