//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the swarm simulator
#[derive(Debug, Parser)]
#[command(name = "swarm-sim-downloader")]
#[command(about = "A tracker-coordinated peer-to-peer swarm download simulator", long_about = None)]
pub struct CliArgs {
    /// Directory holding the per-peer input files (in1.txt, in2.txt, ...)
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Number of peers (0 = autodetect from the input files)
    #[arg(short, long, default_value_t = 0)]
    pub peers: u32,

    /// Directory for completed-file outputs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Generate a synthetic scenario into INPUT_DIR instead of running
    #[arg(long)]
    pub generate: bool,

    /// Number of files to generate (generator mode)
    #[arg(long, default_value_t = 4)]
    pub gen_files: u32,

    /// Maximum segments per generated file (generator mode)
    #[arg(long, default_value_t = 16)]
    pub gen_segments: u32,

    /// RNG seed for the generator
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
