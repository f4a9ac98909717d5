//! swarm-sim-downloader
//!
//! A tracker-coordinated peer-to-peer swarm download simulator.

pub mod cli;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod simulation;
pub mod storage;
pub mod tracker;
pub mod transport;

pub use error::SwarmError;

pub use protocol::{FileId, Message, MessageCode, OwnershipTable, ProcessId, SegmentId, SEGMENT_ID_LEN};
pub use transport::{DownloadLink, LaneReceiver, LaneSender, Network, PeerEndpoint, TrackerEndpoint, UploadLink};
pub use tracker::{SwarmState, Tracker, TrackerPhase, TrackerSummary};
pub use peer::{select_donor, DownloadWorker, PeerOutcome, PeerSession, SegmentStore, UploadWorker};
pub use storage::{
    build_inputs, file_index_from_name, file_name_for, load_peer_input, parse_peer_input,
    write_inputs, DirectoryOutput, MemoryOutput, OutputSink, OwnedFile, PeerInput, ScenarioSpec,
};
pub use cli::{CliArgs, Config, PeerCompletion, RunReport};
pub use simulation::{run, run_swarm};
