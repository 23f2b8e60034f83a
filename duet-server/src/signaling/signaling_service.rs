use crate::lobby::LobbyCommand;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::utils::default_ice_servers;
use duet_core::{IceServerConfig, PeerId, ServerEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// One live socket. `connection` tells a replaced socket apart from its
/// successor under the same `PeerId`.
struct PeerEntry {
    connection: u64,
    tx: mpsc::UnboundedSender<Message>,
}

struct SignalingInner {
    peers: DashMap<PeerId, PeerEntry>,
    next_connection: AtomicU64,
    ice_servers: Vec<IceServerConfig>,
}

#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) lobby_tx: mpsc::Sender<LobbyCommand>,
}

impl SignalingService {
    /// An empty `ice_servers` list announces the public STUN defaults.
    pub fn new(lobby_tx: mpsc::Sender<LobbyCommand>, ice_servers: Vec<IceServerConfig>) -> Self {
        let ice_servers = if ice_servers.is_empty() {
            default_ice_servers()
        } else {
            ice_servers
        };
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                next_connection: AtomicU64::new(1),
                ice_servers,
            }),
            lobby_tx,
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn lobby(&self) -> &mpsc::Sender<LobbyCommand> {
        &self.lobby_tx
    }

    pub fn connected_peers(&self) -> usize {
        self.inner.peers.len()
    }

    /// Registers a socket. Returns its connection id and whether an older
    /// socket for the same peer was displaced; that one is told
    /// `forced-disconnect` and closed.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) -> (u64, bool) {
        let connection = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .inner
            .peers
            .insert(peer_id.clone(), PeerEntry { connection, tx });

        let replaced = match previous {
            Some(old) => {
                warn!("Peer {} connected twice, dropping the older socket", peer_id);
                send_event_to(&old.tx, &peer_id, &ServerEvent::ForcedDisconnect);
                let _ = old.tx.send(Message::Close(None));
                true
            }
            None => false,
        };
        (connection, replaced)
    }

    /// Removes the peer only if `connection` is still its current socket.
    pub fn remove_peer(&self, peer_id: &PeerId, connection: u64) -> bool {
        self.inner
            .peers
            .remove_if(peer_id, |_, entry| entry.connection == connection)
            .is_some()
    }

    pub fn deliver(&self, peer_id: &PeerId, event: &ServerEvent) {
        if let Some(peer) = self.inner.peers.get(peer_id) {
            send_event_to(&peer.tx, peer_id, event);
        } else {
            warn!("Attempted to send event to disconnected peer {}", peer_id);
        }
    }
}

fn send_event_to(tx: &mpsc::UnboundedSender<Message>, peer_id: &PeerId, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            if let Err(e) = tx.send(Message::Text(json.into())) {
                error!("Failed to send WS message to {}: {:?}", peer_id, e);
            }
        }
        Err(e) => error!("Failed to serialize server event: {}", e),
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_event(&self, peer_id: &PeerId, event: ServerEvent) {
        self.deliver(peer_id, &event);
    }

    async fn close_peer(&self, peer_id: &PeerId) {
        if let Some((_, entry)) = self.inner.peers.remove(peer_id) {
            debug!("Closing socket {} of {}", entry.connection, peer_id);
            let _ = entry.tx.send(Message::Close(None));
        }
    }
}
