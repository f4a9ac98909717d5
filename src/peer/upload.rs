//! Upload worker
//!
//! Answers segment requests from every other peer out of the shared
//! segment store until the tracker's shutdown sentinel arrives. Segments
//! acquired by the download worker mid-run are served the same as segments
//! owned from the start.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SwarmError;
use crate::peer::store::SegmentStore;
use crate::protocol::{Message, ProcessId};
use crate::transport::UploadLink;

/// The serving half of a peer
pub struct UploadWorker {
    id: ProcessId,
    store: Arc<RwLock<SegmentStore>>,
    link: UploadLink,
}

impl UploadWorker {
    /// Create a worker over the peer's shared store
    pub fn new(id: ProcessId, store: Arc<RwLock<SegmentStore>>, link: UploadLink) -> Self {
        Self { id, store, link }
    }

    /// Serve requests until shutdown; returns the number served
    pub async fn run(mut self) -> Result<u64> {
        let mut served = 0u64;
        loop {
            let (from, frame) = self.link.request_rx.recv().await?;
            match Message::deserialize(&frame)? {
                Message::Shutdown => {
                    info!("{} upload worker shutting down ({} segments served)", self.id, served);
                    return Ok(served);
                }
                Message::SegmentRequest { file, segment } => {
                    let id = self.store.read().await.segment(file, segment).ok_or_else(|| {
                        SwarmError::protocol_error_with_source(
                            "Segment request for a segment this peer does not own",
                            format!("{} asked {} for {} segment {}", from, self.id, file, segment),
                        )
                    })?;
                    debug!("{}: serving {} segment {} to {}", self.id, file, segment, from);
                    self.link.reply_tx[from.peer_offset()]
                        .send(Message::SegmentReply { id }.serialize())
                        .await?;
                    served += 1;
                }
                other => {
                    return Err(SwarmError::protocol_error_with_source(
                        "Unexpected message on the request lane",
                        format!("{} sent {:?}", from, other.code()),
                    )
                    .into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FileId, SegmentId, SEGMENT_ID_LEN};
    use crate::transport::Network;

    fn sample_id(fill: u8) -> SegmentId {
        SegmentId::from_bytes(&[fill; SEGMENT_ID_LEN]).unwrap()
    }

    #[tokio::test]
    async fn test_serves_owned_segment_then_shuts_down() {
        let mut network = Network::new(2);
        let server = network.peers.remove(0);
        let mut client = network.peers.remove(0);

        let mut store = SegmentStore::new();
        store
            .insert_owned_file(FileId(0), vec![sample_id(b'a'), sample_id(b'b')])
            .unwrap();
        let store = Arc::new(RwLock::new(store));

        let (_download_link, upload_link) = server.split();
        let worker = UploadWorker::new(ProcessId(1), store, upload_link);
        let worker_task = tokio::spawn(worker.run());

        client.request_tx[0]
            .send(Message::SegmentRequest { file: FileId(0), segment: 1 }.serialize())
            .await
            .unwrap();
        let (from, frame) = client.reply_rx.recv().await.unwrap();
        assert_eq!(from, ProcessId(1));
        assert_eq!(
            Message::deserialize(&frame).unwrap(),
            Message::SegmentReply { id: sample_id(b'b') }
        );

        network.tracker.request_tx[0]
            .send(Message::Shutdown.serialize())
            .await
            .unwrap();
        let served = worker_task.await.unwrap().unwrap();
        assert_eq!(served, 1);
    }

    #[tokio::test]
    async fn test_unowned_segment_request_is_fatal() {
        let mut network = Network::new(2);
        let server = network.peers.remove(0);
        let client = network.peers.remove(0);

        let store = Arc::new(RwLock::new(SegmentStore::new()));
        let (_download_link, upload_link) = server.split();
        let worker = UploadWorker::new(ProcessId(1), store, upload_link);
        let worker_task = tokio::spawn(worker.run());

        client.request_tx[0]
            .send(Message::SegmentRequest { file: FileId(0), segment: 0 }.serialize())
            .await
            .unwrap();

        assert!(worker_task.await.unwrap().is_err());
    }
}
