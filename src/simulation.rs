//! Simulation orchestration
//!
//! Wires the tracker and every peer session into one in-process run and
//! collects the results into a run report. Any task failure is fatal to the
//! whole run; there is no cross-process recovery.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::cli::{Config, PeerCompletion, RunReport};
use crate::error::SwarmError;
use crate::peer::{PeerOutcome, PeerSession};
use crate::protocol::ProcessId;
use crate::storage::{file_name_for, load_peer_input, DirectoryOutput, OutputSink, PeerInput};
use crate::tracker::Tracker;
use crate::transport::Network;

/// Run a swarm from in-memory inputs
///
/// Inputs must be numbered consecutively from peer 1. Used directly by
/// tests; the CLI path loads inputs from disk first.
pub async fn run_swarm(inputs: Vec<PeerInput>, sink: Arc<dyn OutputSink>) -> Result<RunReport> {
    let num_peers = inputs.len();
    if num_peers == 0 {
        return Err(SwarmError::config_error_with_field("At least one peer required", "peers").into());
    }
    for (offset, input) in inputs.iter().enumerate() {
        if input.peer != ProcessId::from_peer_offset(offset) {
            return Err(SwarmError::validation_error_with_field(
                format!(
                    "Peer inputs must be numbered consecutively from 1, found {} at position {}",
                    input.peer, offset
                ),
                "peer_id",
            )
            .into());
        }
    }

    info!("Starting swarm run with {} peers", num_peers);
    let started = Instant::now();
    let network = Network::new(num_peers);

    let tracker_task = tokio::spawn(Tracker::new(num_peers, network.tracker).run());

    let mut peer_tasks = Vec::with_capacity(num_peers);
    for (endpoint, input) in network.peers.into_iter().zip(inputs) {
        let session = PeerSession::new(input, endpoint, sink.clone());
        peer_tasks.push(tokio::spawn(session.run()));
    }

    let mut outcomes: Vec<PeerOutcome> = Vec::with_capacity(num_peers);
    for task in peer_tasks {
        let outcome = task.await.map_err(|e| {
            SwarmError::worker_error_full("Peer session did not run to completion", "peer", e.to_string())
        })??;
        outcomes.push(outcome);
    }

    let summary = tracker_task.await.map_err(|e| {
        SwarmError::worker_error_full("Tracker did not run to completion", "tracker", e.to_string())
    })??;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!("Swarm run finished in {} ms", elapsed_ms);

    Ok(RunReport {
        peers: num_peers as u32,
        files: summary.swarm.file_count() as u32,
        queries_served: summary.queries_served,
        segments_recorded: summary.segments_recorded,
        files_completed: summary.files_completed,
        completions: outcomes
            .into_iter()
            .map(|outcome| PeerCompletion {
                peer: outcome.peer.0,
                files: outcome.completed_files.into_iter().map(file_name_for).collect(),
                segments_served: outcome.segments_served,
            })
            .collect(),
        elapsed_ms,
    })
}

/// Run a swarm from on-disk inputs per the configuration
pub async fn run(config: &Config) -> Result<RunReport> {
    let mut inputs = Vec::with_capacity(config.peers as usize);
    for id in 1..=config.peers {
        inputs.push(load_peer_input(&config.input_dir, ProcessId(id)).await?);
    }

    let sink = Arc::new(DirectoryOutput::new(config.output_dir.clone()));
    let report = run_swarm(inputs, sink).await?;

    if let Some(path) = &config.report {
        report.write_json(path).await?;
    }
    Ok(report)
}
