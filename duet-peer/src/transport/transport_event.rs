use crate::negotiator::PeerConnectionHandle;
use duet_core::{IceCandidate, PeerConnectionState};
use tokio::sync::mpsc;

/// Callbacks raised by the underlying real-time transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    LocalCandidate(IceCandidate),
    StateChanged(PeerConnectionState),
}

/// A transport event tagged with the connection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportSignal {
    pub handle: PeerConnectionHandle,
    pub event: TransportEvent,
}

/// Where a transport reports its callbacks. Every event is stamped with the
/// handle of the connection the sink was created for.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    handle: PeerConnectionHandle,
    tx: mpsc::Sender<TransportSignal>,
}

impl TransportEventSink {
    pub fn new(handle: PeerConnectionHandle, tx: mpsc::Sender<TransportSignal>) -> Self {
        Self { handle, tx }
    }

    pub fn handle(&self) -> PeerConnectionHandle {
        self.handle
    }

    /// Returns `false` once the receiving side is gone.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TransportSignal {
                handle: self.handle,
                event,
            })
            .await
            .is_ok()
    }
}
