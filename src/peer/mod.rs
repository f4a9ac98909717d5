//! Peer module
//!
//! A peer's local state and its two concurrent workers.

pub mod download;
pub mod session;
pub mod store;
pub mod upload;

// Re-export main types
pub use download::{select_donor, DownloadWorker};
pub use session::{PeerOutcome, PeerSession};
pub use store::SegmentStore;
pub use upload::UploadWorker;
