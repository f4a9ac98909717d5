//! Download worker
//!
//! Acquires missing segments from other peers, round-robin over the
//! requested files, and keeps the tracker informed of every acquisition.
//! Terminates only once every requested file is fully owned locally, after
//! reporting completion to the tracker exactly once.

use anyhow::Result;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use crate::error::SwarmError;
use crate::peer::store::SegmentStore;
use crate::protocol::{FileId, Message, OwnershipTable, ProcessId};
use crate::storage::OutputSink;
use crate::transport::DownloadLink;

/// The downloading half of a peer
pub struct DownloadWorker {
    id: ProcessId,
    store: Arc<RwLock<SegmentStore>>,
    requested: Vec<FileId>,
    link: DownloadLink,
    sink: Arc<dyn OutputSink>,
    previous_donor: Option<ProcessId>,
    completed: Vec<FileId>,
}

impl DownloadWorker {
    /// Create a worker for the given requested files
    pub fn new(
        id: ProcessId,
        store: Arc<RwLock<SegmentStore>>,
        requested: Vec<FileId>,
        link: DownloadLink,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            id,
            store,
            requested,
            link,
            sink,
            previous_donor: None,
            completed: Vec::new(),
        }
    }

    /// Run until every requested file is owned; returns the completed files
    pub async fn run(mut self) -> Result<Vec<FileId>> {
        // Requested files that are already fully owned (a peer may request a
        // file it was seeded with) are closed out before the fetch loop.
        for file in self.requested.clone() {
            self.finish_if_complete(file).await?;
        }

        if self.requested.is_empty() {
            info!("{} has nothing to download", self.id);
            self.link.control_tx.send(Message::AllFilesComplete.serialize()).await?;
            return Ok(self.completed);
        }

        loop {
            for file in self.requested.clone() {
                if !self.requested.contains(&file) {
                    continue;
                }
                self.fetch_next_segment(file).await?;
                if self.requested.is_empty() {
                    self.link.control_tx.send(Message::AllFilesComplete.serialize()).await?;
                    info!("{} finished all downloads", self.id);
                    return Ok(self.completed);
                }
            }
        }
    }

    /// One round-robin pass over a single file: fetch at most one segment
    async fn fetch_next_segment(&mut self, file: FileId) -> Result<()> {
        self.link
            .control_tx
            .send(Message::PeerListQuery { file }.serialize())
            .await?;
        let table = self.receive_peer_list(file).await?;

        let missing = self.store.read().await.first_missing(file)?;
        let Some(segment) = missing else {
            self.finish_if_complete(file).await?;
            return Ok(());
        };

        let Some(donor) = select_donor(&table, segment, self.id, self.previous_donor) else {
            // Nobody offers this segment yet; retry on a later pass.
            trace!("{}: no donor for {} segment {} this pass", self.id, file, segment);
            return Ok(());
        };
        self.previous_donor = Some(donor);

        debug!("{}: fetching {} segment {} from {}", self.id, file, segment, donor);
        self.link.request_tx[donor.peer_offset()]
            .send(Message::SegmentRequest { file, segment }.serialize())
            .await?;
        let (from, frame) = self.link.reply_rx.recv().await?;
        let id = match Message::deserialize(&frame)? {
            Message::SegmentReply { id } => id,
            other => {
                return Err(SwarmError::protocol_error_with_source(
                    "Expected a segment reply",
                    format!("{} sent {:?}", from, other.code()),
                )
                .into());
            }
        };

        self.store.write().await.record(file, segment, id)?;
        self.link
            .control_tx
            .send(Message::SegmentAcquired { file, segment }.serialize())
            .await?;

        self.finish_if_complete(file).await?;
        Ok(())
    }

    async fn receive_peer_list(&mut self, file: FileId) -> Result<OwnershipTable> {
        let (from, frame) = self.link.reply_rx.recv().await?;
        match Message::deserialize(&frame)? {
            Message::PeerListReply { file: replied, table } if replied == file => Ok(table),
            other => Err(SwarmError::protocol_error_with_source(
                "Expected a peer list reply",
                format!("{} sent {:?}", from, other.code()),
            )
            .into()),
        }
    }

    /// Close out a fully-owned file: emit output, tell the tracker, drop it
    /// from the requested set.
    async fn finish_if_complete(&mut self, file: FileId) -> Result<bool> {
        let segments = {
            let store = self.store.read().await;
            if !store.is_complete(file) {
                return Ok(false);
            }
            store.segments_of(file)?
        };

        self.sink.write_file(self.id, file, &segments).await?;
        self.link
            .control_tx
            .send(Message::FileComplete { file }.serialize())
            .await?;
        self.requested.retain(|f| *f != file);
        self.completed.push(file);
        info!("{} completed {}", self.id, file);
        Ok(true)
    }
}

/// Choose a donor owning the given segment
///
/// Prefers a donor different from the one used for the previous fetch; the
/// previous donor is reused only when it is the sole holder. The worker's
/// own row is never a candidate.
pub fn select_donor(
    table: &OwnershipTable,
    segment: u32,
    own: ProcessId,
    previous: Option<ProcessId>,
) -> Option<ProcessId> {
    let holders: Vec<ProcessId> = table
        .holders(segment)
        .into_iter()
        .map(ProcessId::from_peer_offset)
        .filter(|p| *p != own)
        .collect();

    let fresh: Vec<ProcessId> = holders
        .iter()
        .copied()
        .filter(|p| Some(*p) != previous)
        .collect();

    match fresh.choose(&mut rand::thread_rng()) {
        Some(donor) => Some(*donor),
        None => holders.first().copied(),
    }
}
