//! Tracker service
//!
//! The single coordinating process. It owns the swarm state exclusively and
//! serializes every mutation by handling one message at a time, which is the
//! only synchronization the state needs. It also drives global termination:
//! once every peer has reported completion it broadcasts the shutdown
//! sentinel that releases the upload workers.

use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::SwarmError;
use crate::protocol::{Message, ProcessId};
use crate::tracker::swarm::SwarmState;
use crate::transport::TrackerEndpoint;

/// Lifecycle phase of the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Collecting one registration report per peer
    Registration,
    /// Answering queries and recording acquisitions
    Serving,
    /// Broadcasting the shutdown sentinel
    ShuttingDown,
    /// Done; the serving loop has exited
    Terminated,
}

/// Counters and final state returned when the tracker terminates
#[derive(Debug)]
pub struct TrackerSummary {
    /// Peer-list queries answered
    pub queries_served: u64,
    /// Individual segment acquisitions recorded
    pub segments_recorded: u64,
    /// Whole-file completions recorded
    pub files_completed: u64,
    /// Final swarm state at shutdown
    pub swarm: SwarmState,
}

/// The tracker process
pub struct Tracker {
    num_peers: usize,
    endpoint: TrackerEndpoint,
    swarm: SwarmState,
    phase: TrackerPhase,
}

impl Tracker {
    /// Create a tracker for the given peer count
    pub fn new(num_peers: usize, endpoint: TrackerEndpoint) -> Self {
        Self {
            num_peers,
            endpoint,
            swarm: SwarmState::new(num_peers),
            phase: TrackerPhase::Registration,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Run the tracker to termination
    pub async fn run(mut self) -> Result<TrackerSummary> {
        info!("Tracker starting for {} peers", self.num_peers);
        self.registration().await?;
        let summary = self.serve().await?;
        info!(
            "Tracker terminated ({} queries, {} acquisitions, {} completions)",
            summary.queries_served, summary.segments_recorded, summary.files_completed
        );
        Ok(summary)
    }

    /// Registration phase: collect every peer's report, broadcast the
    /// catalog, then synchronize before serving begins.
    async fn registration(&mut self) -> Result<()> {
        self.endpoint.barrier.wait().await;
        debug!("Tracker entering registration phase");

        for _ in 0..self.num_peers {
            let (from, frame) = self.endpoint.control_rx.recv().await?;
            match Message::deserialize(&frame)? {
                Message::Register { files } => {
                    self.swarm.record_registration(from, &files)?;
                }
                other => {
                    return Err(SwarmError::protocol_error_with_source(
                        "Expected a registration report",
                        format!("{} sent {:?}", from, other.code()),
                    )
                    .into());
                }
            }
        }

        let catalog = self.swarm.catalog();
        info!(
            "Registration complete: {} files across {} peers",
            catalog.len(),
            self.num_peers
        );
        for reply_tx in &self.endpoint.reply_tx {
            reply_tx
                .send(Message::CatalogReply { files: catalog.clone() }.serialize())
                .await?;
        }

        self.phase = TrackerPhase::Serving;
        self.endpoint.barrier.wait().await;
        Ok(())
    }

    /// Serving phase: dispatch one message at a time until every peer has
    /// reported completion, then broadcast shutdown.
    async fn serve(&mut self) -> Result<TrackerSummary> {
        debug!("Tracker entering serving phase");

        let mut queries_served = 0u64;
        let mut segments_recorded = 0u64;
        let mut files_completed = 0u64;
        let mut finished: HashSet<ProcessId> = HashSet::new();
        let mut remaining = self.num_peers;

        while remaining > 0 {
            let (from, frame) = self.endpoint.control_rx.recv().await?;
            match Message::deserialize(&frame)? {
                Message::PeerListQuery { file } => {
                    let table = self.swarm.ownership_table(file)?;
                    self.endpoint.reply_tx[from.peer_offset()]
                        .send(Message::PeerListReply { file, table }.serialize())
                        .await?;
                    queries_served += 1;
                }
                Message::SegmentAcquired { file, segment } => {
                    self.swarm.mark_owned(file, from, segment)?;
                    segments_recorded += 1;
                }
                Message::FileComplete { file } => {
                    self.swarm.mark_file_complete(file, from)?;
                    files_completed += 1;
                }
                Message::AllFilesComplete => {
                    if !finished.insert(from) {
                        return Err(SwarmError::protocol_error_with_source(
                            "Duplicate completion report",
                            from.to_string(),
                        )
                        .into());
                    }
                    remaining -= 1;
                    info!("{} finished downloading ({} peers still active)", from, remaining);
                }
                other => {
                    warn!("Unexpected message in serving phase from {}: {:?}", from, other.code());
                    return Err(SwarmError::protocol_error_with_source(
                        "Unexpected message in serving phase",
                        format!("{} sent {:?}", from, other.code()),
                    )
                    .into());
                }
            }
        }

        self.phase = TrackerPhase::ShuttingDown;
        info!("All peers finished, broadcasting shutdown");
        for request_tx in &self.endpoint.request_tx {
            request_tx.send(Message::Shutdown.serialize()).await?;
        }
        self.phase = TrackerPhase::Terminated;

        Ok(TrackerSummary {
            queries_served,
            segments_recorded,
            files_completed,
            swarm: std::mem::replace(&mut self.swarm, SwarmState::new(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FileId, Message};
    use crate::transport::Network;

    /// Drive one fake peer through the registration phase.
    async fn register_peer(
        endpoint: &mut crate::transport::PeerEndpoint,
        files: Vec<(FileId, u32)>,
    ) -> Vec<(FileId, u32)> {
        endpoint.barrier.wait().await;
        endpoint
            .control_tx
            .send(Message::Register { files }.serialize())
            .await
            .unwrap();
        let (from, frame) = endpoint.reply_rx.recv().await.unwrap();
        assert_eq!(from, ProcessId::TRACKER);
        let catalog = match Message::deserialize(&frame).unwrap() {
            Message::CatalogReply { files } => files,
            other => panic!("expected catalog, got {:?}", other),
        };
        endpoint.barrier.wait().await;
        catalog
    }

    #[tokio::test]
    async fn test_registration_serving_and_shutdown() {
        let mut network = Network::new(1);
        let mut peer = network.peers.remove(0);
        let tracker = Tracker::new(1, network.tracker);
        let tracker_task = tokio::spawn(tracker.run());

        let catalog = register_peer(&mut peer, vec![(FileId(0), 2)]).await;
        assert_eq!(catalog, vec![(FileId(0), 2)]);

        // Query, then report one acquisition and completion.
        peer.control_tx
            .send(Message::PeerListQuery { file: FileId(0) }.serialize())
            .await
            .unwrap();
        let (_, frame) = peer.reply_rx.recv().await.unwrap();
        match Message::deserialize(&frame).unwrap() {
            Message::PeerListReply { file, table } => {
                assert_eq!(file, FileId(0));
                assert!(table.has(0, 0));
            }
            other => panic!("expected peer list, got {:?}", other),
        }

        peer.control_tx
            .send(Message::AllFilesComplete.serialize())
            .await
            .unwrap();

        // The shutdown sentinel arrives on the request lane exactly once.
        let (from, frame) = peer.request_rx.recv().await.unwrap();
        assert_eq!(from, ProcessId::TRACKER);
        assert_eq!(Message::deserialize(&frame).unwrap(), Message::Shutdown);

        let summary = tracker_task.await.unwrap().unwrap();
        assert_eq!(summary.queries_served, 1);
        assert_eq!(summary.segments_recorded, 0);
        assert!(summary.swarm.peer_owns(FileId(0), ProcessId(1), 1));
    }

    #[tokio::test]
    async fn test_acquisitions_are_recorded() {
        let mut network = Network::new(2);
        let mut first = network.peers.remove(0);
        let mut second = network.peers.remove(0);
        let tracker = Tracker::new(2, network.tracker);
        let tracker_task = tokio::spawn(tracker.run());

        let first_reg = tokio::spawn(async move {
            register_peer(&mut first, vec![(FileId(0), 3)]).await;
            first
        });
        register_peer(&mut second, vec![]).await;
        let mut first = first_reg.await.unwrap();

        second
            .control_tx
            .send(Message::SegmentAcquired { file: FileId(0), segment: 1 }.serialize())
            .await
            .unwrap();
        second
            .control_tx
            .send(Message::FileComplete { file: FileId(0) }.serialize())
            .await
            .unwrap();
        second.control_tx.send(Message::AllFilesComplete.serialize()).await.unwrap();
        first.control_tx.send(Message::AllFilesComplete.serialize()).await.unwrap();

        let (_, frame) = first.request_rx.recv().await.unwrap();
        assert_eq!(Message::deserialize(&frame).unwrap(), Message::Shutdown);
        let (_, frame) = second.request_rx.recv().await.unwrap();
        assert_eq!(Message::deserialize(&frame).unwrap(), Message::Shutdown);

        let summary = tracker_task.await.unwrap().unwrap();
        assert_eq!(summary.segments_recorded, 1);
        assert_eq!(summary.files_completed, 1);
        for segment in 0..3 {
            assert!(summary.swarm.peer_owns(FileId(0), ProcessId(2), segment));
        }
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_rejected() {
        let mut network = Network::new(2);
        let mut first = network.peers.remove(0);
        let mut second = network.peers.remove(0);
        let tracker = Tracker::new(2, network.tracker);
        let tracker_task = tokio::spawn(tracker.run());

        let first_reg = tokio::spawn(async move {
            register_peer(&mut first, vec![(FileId(0), 1)]).await;
            first
        });
        register_peer(&mut second, vec![]).await;
        let first = first_reg.await.unwrap();

        first.control_tx.send(Message::AllFilesComplete.serialize()).await.unwrap();
        first.control_tx.send(Message::AllFilesComplete.serialize()).await.unwrap();

        let result = tracker_task.await.unwrap();
        assert!(result.is_err());
        drop(second);
    }
}
