use async_trait::async_trait;
use duet_core::{PeerId, ServerEvent};
use duet_server::SignalingOutput;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// An event the lobby sent to a peer.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub peer_id: PeerId,
    pub event: ServerEvent,
}

/// Mock SignalingOutput that captures everything the lobby sends.
#[derive(Clone)]
pub struct MockSignalingOutput {
    tx: mpsc::UnboundedSender<SentEvent>,
    sent: Arc<Mutex<Vec<SentEvent>>>,
    closed: Arc<Mutex<Vec<PeerId>>>,
}

impl MockSignalingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    pub async fn sent_to(&self, peer_id: &PeerId) -> Vec<ServerEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| &s.peer_id == peer_id)
            .map(|s| s.event.clone())
            .collect()
    }

    pub async fn closed(&self) -> Vec<PeerId> {
        self.closed.lock().await.clone()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send_event(&self, peer_id: &PeerId, event: ServerEvent) {
        let sent = SentEvent {
            peer_id: peer_id.clone(),
            event,
        };
        self.sent.lock().await.push(sent.clone());
        let _ = self.tx.send(sent);
    }

    async fn close_peer(&self, peer_id: &PeerId) {
        self.closed.lock().await.push(peer_id.clone());
    }
}
