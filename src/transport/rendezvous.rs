//! Rendezvous message lanes
//!
//! A lane is a point-to-point-addressable inbox with synchronous rendezvous
//! send semantics: `send` completes only once the receiving side has taken
//! the message. The completion of a send therefore implies acceptance, which
//! is the sole coordination primitive the swarm protocol relies on. There is
//! no buffering beyond the single in-flight envelope, no timeout and no
//! retry; a closed lane is a fatal transport error.

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::SwarmError;
use crate::protocol::ProcessId;

/// One message in flight on a lane
struct Envelope {
    from: ProcessId,
    frame: Vec<u8>,
    ack: oneshot::Sender<()>,
}

/// Cloneable handle to a lane, from which per-sender handles are derived
#[derive(Clone)]
pub struct LaneHandle {
    to: ProcessId,
    tx: mpsc::Sender<Envelope>,
}

impl LaneHandle {
    /// Derive a sender stamped with the sending process id
    pub fn sender(&self, from: ProcessId) -> LaneSender {
        LaneSender {
            from,
            to: self.to,
            tx: self.tx.clone(),
        }
    }
}

/// Sending side of a lane, stamped with the sender's process id
#[derive(Clone)]
pub struct LaneSender {
    from: ProcessId,
    to: ProcessId,
    tx: mpsc::Sender<Envelope>,
}

impl LaneSender {
    /// The process this sender delivers to
    pub fn target(&self) -> ProcessId {
        self.to
    }

    /// Rendezvous send: blocks until the receiver has accepted the frame
    pub async fn send(&self, frame: Vec<u8>) -> Result<()> {
        trace!("{} -> {}: sending {} byte frame", self.from, self.to, frame.len());
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                from: self.from,
                frame,
                ack: ack_tx,
            })
            .await
            .map_err(|_| {
                SwarmError::transport_error_with_endpoint("Receiving lane closed", self.to.to_string())
            })?;
        ack_rx.await.map_err(|_| {
            SwarmError::transport_error_with_endpoint(
                "Receiver dropped the lane before accepting",
                self.to.to_string(),
            )
        })?;
        trace!("{} -> {}: frame accepted", self.from, self.to);
        Ok(())
    }
}

/// Receiving side of a lane
pub struct LaneReceiver {
    owner: ProcessId,
    rx: mpsc::Receiver<Envelope>,
}

impl LaneReceiver {
    /// Receive the next frame, acknowledging acceptance to the sender
    pub async fn recv(&mut self) -> Result<(ProcessId, Vec<u8>)> {
        let envelope = self.rx.recv().await.ok_or_else(|| {
            SwarmError::transport_error_with_endpoint("All senders closed", self.owner.to_string())
        })?;
        // The sender may already be gone if its task failed; acceptance of
        // the frame stands either way.
        let _ = envelope.ack.send(());
        trace!("{}: accepted {} byte frame from {}", self.owner, envelope.frame.len(), envelope.from);
        Ok((envelope.from, envelope.frame))
    }
}

/// Create a lane owned by the given process
pub fn lane(owner: ProcessId) -> (LaneHandle, LaneReceiver) {
    // Capacity 1 holds the single envelope being handed over; the ack keeps
    // rendezvous semantics regardless.
    let (tx, rx) = mpsc::channel(1);
    (LaneHandle { to: owner, tx }, LaneReceiver { owner, rx })
}
