//! Storage module
//!
//! Peer input parsing, output sinks and scenario generation.

pub mod input;
pub mod naming;
pub mod output;
pub mod scenario;

// Re-export input types
pub use input::{input_path, load_peer_input, parse_peer_input, OwnedFile, PeerInput};

// Re-export naming helpers
pub use naming::{file_index_from_name, file_name_for};

// Re-export output types
pub use output::{DirectoryOutput, MemoryOutput, OutputSink};

// Re-export scenario types
pub use scenario::{build_inputs, render_input, write_inputs, ScenarioSpec};
