//! CLI module
//!
//! Command-line interface for the swarm simulator.

pub mod args;
pub mod config;
pub mod report;

pub use args::CliArgs;
pub use config::{detect_peer_count, Config};
pub use report::{PeerCompletion, RunReport};
