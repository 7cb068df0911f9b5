//! The broadcast primitive the session sends through

use inkboard_ipc::DrawMessage;
use tokio::sync::mpsc;

/// Identity of a connected peer
pub type PeerId = u64;

/// Fire-and-forget fan-out to connected peers.
///
/// Transport is the host's concern; it is assumed to deliver reliably and
/// in order once a message is handed over.
pub trait Broadcast: Send + Sync {
    /// Send to every peer except `exclude`
    fn broadcast(&self, message: DrawMessage, exclude: Option<PeerId>);
}

/// A message waiting to be fanned out
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub message: DrawMessage,
    pub exclude: Option<PeerId>,
}

/// Broadcaster that hands messages to a channel drained by the host's transport
#[derive(Debug, Clone)]
pub struct ChannelBroadcast {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelBroadcast {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Broadcast for ChannelBroadcast {
    fn broadcast(&self, message: DrawMessage, exclude: Option<PeerId>) {
        if self.tx.send(Outbound { message, exclude }).is_err() {
            tracing::warn!("broadcast channel closed, dropping message");
        }
    }
}
