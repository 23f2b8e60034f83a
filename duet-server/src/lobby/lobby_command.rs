use duet_core::{MatchCriteria, PeerId, RoomId, SignalingMessage};
use serde::Serialize;
use tokio::sync::oneshot;

/// Commands for the lobby actor, sent by the signaling layer.
#[derive(Debug)]
pub enum LobbyCommand {
    FindPartner {
        peer_id: PeerId,
        criteria: MatchCriteria,
    },
    CancelSearch {
        peer_id: PeerId,
    },
    LeaveRoom {
        peer_id: PeerId,
        room_id: RoomId,
    },
    /// Forward a signaling message to the sender's partner.
    Relay {
        peer_id: PeerId,
        message: SignalingMessage,
    },
    /// The peer's socket is gone.
    Disconnect {
        peer_id: PeerId,
    },
    /// Operator removal: the peer is told `forced-disconnect` and its socket closed.
    Kick {
        peer_id: PeerId,
    },
    Stats {
        reply: oneshot::Sender<LobbyStats>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LobbyStats {
    pub waiting: usize,
    pub rooms: usize,
}
