//! In-process network topology
//!
//! Builds the fixed message topology for one run: a tracker endpoint and one
//! endpoint per peer. Every peer has two inbound lanes, a request lane
//! served by its upload worker and a reply lane read by its download worker;
//! the tracker has a single control lane all tracker-bound messages arrive
//! on. A shared barrier spans the tracker and every peer for the two
//! registration-phase synchronization points.

use std::sync::Arc;
use tokio::sync::Barrier;
use tracing::debug;

use crate::protocol::ProcessId;
use crate::transport::rendezvous::{lane, LaneReceiver, LaneSender};

/// The tracker's view of the topology
pub struct TrackerEndpoint {
    /// Inbox for every tracker-bound message
    pub control_rx: LaneReceiver,
    /// Senders to each peer's request lane, indexed by peer offset
    pub request_tx: Vec<LaneSender>,
    /// Senders to each peer's reply lane, indexed by peer offset
    pub reply_tx: Vec<LaneSender>,
    /// Run-wide phase barrier
    pub barrier: Arc<Barrier>,
}

/// One peer's view of the topology
pub struct PeerEndpoint {
    /// This peer's process id
    pub id: ProcessId,
    /// Run-wide phase barrier
    pub barrier: Arc<Barrier>,
    /// Sender to the tracker's control lane
    pub control_tx: LaneSender,
    /// Inbox for replies (catalog, peer lists, segment replies)
    pub reply_rx: LaneReceiver,
    /// Inbox for segment requests and the shutdown sentinel
    pub request_rx: LaneReceiver,
    /// Senders to every peer's request lane, indexed by peer offset
    pub request_tx: Vec<LaneSender>,
    /// Senders to every peer's reply lane, indexed by peer offset
    pub reply_tx: Vec<LaneSender>,
}

/// The download worker's half of a peer endpoint
pub struct DownloadLink {
    pub id: ProcessId,
    pub control_tx: LaneSender,
    pub reply_rx: LaneReceiver,
    pub request_tx: Vec<LaneSender>,
}

/// The upload worker's half of a peer endpoint
pub struct UploadLink {
    pub id: ProcessId,
    pub request_rx: LaneReceiver,
    pub reply_tx: Vec<LaneSender>,
}

impl PeerEndpoint {
    /// Split the endpoint into the two worker halves
    pub fn split(self) -> (DownloadLink, UploadLink) {
        (
            DownloadLink {
                id: self.id,
                control_tx: self.control_tx,
                reply_rx: self.reply_rx,
                request_tx: self.request_tx,
            },
            UploadLink {
                id: self.id,
                request_rx: self.request_rx,
                reply_tx: self.reply_tx,
            },
        )
    }
}

/// The complete topology for one run
pub struct Network {
    pub tracker: TrackerEndpoint,
    pub peers: Vec<PeerEndpoint>,
}

impl Network {
    /// Build the topology for the given number of peers
    pub fn new(num_peers: usize) -> Self {
        debug!("Building network topology for {} peers", num_peers);

        // Barrier spans the tracker plus every peer.
        let barrier = Arc::new(Barrier::new(num_peers + 1));

        let (control_handle, control_rx) = lane(ProcessId::TRACKER);

        let mut request_handles = Vec::with_capacity(num_peers);
        let mut request_rxs = Vec::with_capacity(num_peers);
        let mut reply_handles = Vec::with_capacity(num_peers);
        let mut reply_rxs = Vec::with_capacity(num_peers);

        for offset in 0..num_peers {
            let id = ProcessId::from_peer_offset(offset);
            let (handle, rx) = lane(id);
            request_handles.push(handle);
            request_rxs.push(rx);
            let (handle, rx) = lane(id);
            reply_handles.push(handle);
            reply_rxs.push(rx);
        }

        let tracker = TrackerEndpoint {
            control_rx,
            request_tx: request_handles
                .iter()
                .map(|h| h.sender(ProcessId::TRACKER))
                .collect(),
            reply_tx: reply_handles
                .iter()
                .map(|h| h.sender(ProcessId::TRACKER))
                .collect(),
            barrier: barrier.clone(),
        };

        let mut peers = Vec::with_capacity(num_peers);
        for (offset, (request_rx, reply_rx)) in request_rxs.into_iter().zip(reply_rxs).enumerate() {
            let id = ProcessId::from_peer_offset(offset);
            peers.push(PeerEndpoint {
                id,
                barrier: barrier.clone(),
                control_tx: control_handle.sender(id),
                reply_rx,
                request_rx,
                request_tx: request_handles.iter().map(|h| h.sender(id)).collect(),
                reply_tx: reply_handles.iter().map(|h| h.sender(id)).collect(),
            });
        }

        Network { tracker, peers }
    }
}
