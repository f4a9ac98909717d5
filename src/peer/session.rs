//! Peer session
//!
//! One peer process: registers its holdings with the tracker, adopts the
//! swarm-wide catalog sizes for the files it wants, then runs its download
//! and upload workers concurrently until both finish.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SwarmError;
use crate::peer::download::DownloadWorker;
use crate::peer::store::SegmentStore;
use crate::peer::upload::UploadWorker;
use crate::protocol::{FileId, Message, ProcessId};
use crate::storage::{OutputSink, PeerInput};
use crate::transport::PeerEndpoint;

/// What one peer accomplished during a run
#[derive(Debug, Clone)]
pub struct PeerOutcome {
    pub peer: ProcessId,
    pub completed_files: Vec<FileId>,
    pub segments_served: u64,
}

/// One peer's run through the whole protocol
pub struct PeerSession {
    input: PeerInput,
    endpoint: PeerEndpoint,
    sink: Arc<dyn OutputSink>,
}

impl PeerSession {
    /// Create a session from parsed input
    pub fn new(input: PeerInput, endpoint: PeerEndpoint, sink: Arc<dyn OutputSink>) -> Self {
        Self { input, endpoint, sink }
    }

    /// Run the peer to completion
    pub async fn run(self) -> Result<PeerOutcome> {
        let id = self.endpoint.id;
        let barrier = self.endpoint.barrier.clone();
        let requested = self.input.requested.clone();

        let mut store = SegmentStore::new();
        for owned in self.input.owned {
            store.insert_owned_file(owned.file, owned.segments)?;
        }

        let (mut download_link, upload_link) = self.endpoint.split();

        // Registration phase: report holdings, receive the catalog.
        barrier.wait().await;
        let report = store.owned_report();
        debug!("{} registering {} files", id, report.len());
        download_link
            .control_tx
            .send(Message::Register { files: report }.serialize())
            .await?;

        let (_, frame) = download_link.reply_rx.recv().await?;
        let catalog: HashMap<FileId, u32> = match Message::deserialize(&frame)? {
            Message::CatalogReply { files } => files.into_iter().collect(),
            other => {
                return Err(SwarmError::protocol_error_with_source(
                    "Expected the swarm catalog",
                    format!("tracker sent {:?}", other.code()),
                )
                .into());
            }
        };

        for file in &requested {
            let size = catalog.get(file).copied().ok_or_else(|| {
                SwarmError::validation_error_with_field(
                    format!("{} requested {} which no peer registered", id, file),
                    "requested_files",
                )
            })?;
            store.prepare_requested(*file, size);
        }
        barrier.wait().await;

        // Both workers share the store; the download worker is the only
        // writer.
        let store = Arc::new(RwLock::new(store));
        let download = DownloadWorker::new(id, store.clone(), requested, download_link, self.sink);
        let upload = UploadWorker::new(id, store, upload_link);

        info!("{} starting download and upload workers", id);
        let download_task = tokio::spawn(download.run());
        let upload_task = tokio::spawn(upload.run());

        let completed_files = download_task.await.map_err(|e| {
            SwarmError::worker_error_full("Download worker did not run to completion", "download", e.to_string())
        })??;
        let segments_served = upload_task.await.map_err(|e| {
            SwarmError::worker_error_full("Upload worker did not run to completion", "upload", e.to_string())
        })??;

        info!(
            "{} done: {} files completed, {} segments served",
            id,
            completed_files.len(),
            segments_served
        );
        Ok(PeerOutcome { peer: id, completed_files, segments_served })
    }
}
