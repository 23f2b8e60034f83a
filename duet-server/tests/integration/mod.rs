//! Integration tests for duet-server.
//!
//! - `lobby_tests` - pairing, relay and room lifecycle against a mock output
//! - `http_tests` - the real router over WebSocket


use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Level;

use duet_core::{PeerId, RoomAssignment, ServerEvent};
use duet_server::{Lobby, LobbyCommand};

use crate::utils::{MockSignalingOutput, SentEvent};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_lobby() -> (
    mpsc::Sender<LobbyCommand>,
    mpsc::UnboundedReceiver<SentEvent>,
    MockSignalingOutput,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<LobbyCommand>(100);
    let (signaling, sent_rx) = MockSignalingOutput::new();

    let lobby = Lobby::new(cmd_rx, Box::new(signaling.clone()));
    tokio::spawn(async move {
        lobby.run().await;
    });

    (cmd_tx, sent_rx, signaling)
}

pub async fn next_sent(rx: &mut mpsc::UnboundedReceiver<SentEvent>) -> SentEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for lobby output")
        .expect("Lobby output closed")
}

/// Reads the two `room-assigned` events of a fresh pairing, keyed by peer.
pub async fn next_pairing(
    rx: &mut mpsc::UnboundedReceiver<SentEvent>,
) -> Vec<(PeerId, RoomAssignment)> {
    let mut assignments = Vec::new();
    while assignments.len() < 2 {
        let sent = next_sent(rx).await;
        if let ServerEvent::RoomAssigned(a) = sent.event {
            assignments.push((sent.peer_id, a));
        }
    }
    assignments
}

/// Lets the lobby drain its queue before asserting on the absence of output.
pub async fn settle(cmd_tx: &mpsc::Sender<LobbyCommand>) -> duet_server::LobbyStats {
    let (reply, rx) = tokio::sync::oneshot::channel();
    cmd_tx
        .send(LobbyCommand::Stats { reply })
        .await
        .expect("Lobby gone");
    rx.await.expect("No stats reply")
}
