use async_trait::async_trait;
use duet_core::{PeerId, ServerEvent};

/// Outbound side of the signaling layer, as seen by the lobby.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver `event` to `peer_id` if it is connected.
    async fn send_event(&self, peer_id: &PeerId, event: ServerEvent);

    /// Close the peer's socket.
    async fn close_peer(&self, peer_id: &PeerId);
}
