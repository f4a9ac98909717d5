//! Message transport
//!
//! Rendezvous lanes and the in-process topology they are wired into.

pub mod network;
pub mod rendezvous;

// Re-export main types
pub use network::{DownloadLink, Network, PeerEndpoint, TrackerEndpoint, UploadLink};
pub use rendezvous::{lane, LaneHandle, LaneReceiver, LaneSender};
