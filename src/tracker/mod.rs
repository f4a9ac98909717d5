//! Tracker module
//!
//! The central coordinator: swarm ownership state and the service loop
//! driving registration, serving and termination.

pub mod service;
pub mod swarm;

// Re-export main types
pub use service::{Tracker, TrackerPhase, TrackerSummary};
pub use swarm::SwarmState;
