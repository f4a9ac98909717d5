//! Swarm coordination protocol
//!
//! The closed message taxonomy spoken between the tracker and the peers.

pub mod message;

// Re-export main types
pub use message::{
    FileId, Message, MessageCode, OwnershipTable, ProcessId, SegmentId, SEGMENT_ID_LEN,
};
