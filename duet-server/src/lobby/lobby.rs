use crate::lobby::{LobbyCommand, LobbyStats, Pairing};
use crate::signaling::SignalingOutput;
use duet_core::{MatchCriteria, PeerId, RoomId, ServerEvent, SignalingMessage};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Waiter {
    peer_id: PeerId,
    criteria: MatchCriteria,
}

/// Rendezvous actor: pairs waiting participants into Rooms and relays
/// signaling between the two members of a Room.
///
/// All state lives on one task; the signaling layer only talks to it through
/// [`LobbyCommand`]s.
pub struct Lobby {
    command_rx: mpsc::Receiver<LobbyCommand>,
    signaling: Box<dyn SignalingOutput>,

    /// Oldest first.
    waiting: VecDeque<Waiter>,
    rooms: HashMap<RoomId, Pairing>,
    membership: HashMap<PeerId, RoomId>,
}

impl Lobby {
    pub fn new(command_rx: mpsc::Receiver<LobbyCommand>, signaling: Box<dyn SignalingOutput>) -> Self {
        Self {
            command_rx,
            signaling,
            waiting: VecDeque::new(),
            rooms: HashMap::new(),
            membership: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        info!("Lobby event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Lobby event loop finished");
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::FindPartner { peer_id, criteria } => {
                self.find_partner(peer_id, criteria).await
            }
            LobbyCommand::CancelSearch { peer_id } => {
                if self.remove_waiter(&peer_id) {
                    info!("Peer {} stopped searching", peer_id);
                }
            }
            LobbyCommand::LeaveRoom { peer_id, room_id } => {
                if self.membership.get(&peer_id) == Some(&room_id) {
                    self.close_room(&room_id, &peer_id).await;
                } else {
                    debug!("Peer {} left {} which is not its room", peer_id, room_id);
                }
            }
            LobbyCommand::Relay { peer_id, message } => self.relay(peer_id, message).await,
            LobbyCommand::Disconnect { peer_id } => {
                info!("Peer {} disconnected", peer_id);
                self.forget(&peer_id).await;
            }
            LobbyCommand::Kick { peer_id } => {
                info!("Kicking peer {}", peer_id);
                self.signaling
                    .send_event(&peer_id, ServerEvent::ForcedDisconnect)
                    .await;
                self.forget(&peer_id).await;
                self.signaling.close_peer(&peer_id).await;
            }
            LobbyCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    pub fn stats(&self) -> LobbyStats {
        LobbyStats {
            waiting: self.waiting.len(),
            rooms: self.rooms.len(),
        }
    }

    async fn find_partner(&mut self, peer_id: PeerId, criteria: MatchCriteria) {
        if let Some(room_id) = self.membership.get(&peer_id).cloned() {
            info!("Peer {} searches again, leaving {}", peer_id, room_id);
            self.close_room(&room_id, &peer_id).await;
        }

        let position = match self.waiting.iter().position(|w| w.peer_id == peer_id) {
            Some(index) => {
                debug!("Peer {} updated its criteria", peer_id);
                self.waiting[index].criteria = criteria;
                index
            }
            None => {
                self.waiting.push_back(Waiter { peer_id, criteria });
                self.waiting.len() - 1
            }
        };

        let seeker = &self.waiting[position];
        let partner = self
            .waiting
            .iter()
            .enumerate()
            .find(|(i, w)| *i != position && w.criteria.is_compatible(&seeker.criteria))
            .map(|(i, _)| i);

        let Some(partner) = partner else {
            debug!(
                "Peer {} is waiting ({} in queue)",
                self.waiting[position].peer_id,
                self.waiting.len()
            );
            return;
        };

        // Remove the later index first so the earlier one stays valid.
        let (first, second) = if partner < position {
            (partner, position)
        } else {
            (position, partner)
        };
        let Some(responder) = self.waiting.remove(second) else {
            return;
        };
        let Some(initiator) = self.waiting.remove(first) else {
            return;
        };

        self.open_room(initiator.peer_id, responder.peer_id).await;
    }

    async fn open_room(&mut self, initiator: PeerId, responder: PeerId) {
        let room_id = RoomId::new();
        info!(
            "Room {} opened: {} (initiator) with {} (responder)",
            room_id, initiator, responder
        );

        let pairing = Pairing::new(initiator, responder);
        for member in pairing.members() {
            self.membership.insert(member.clone(), room_id.clone());
        }

        for member in pairing.members() {
            if let Some(assignment) = pairing.assignment_for(&room_id, member) {
                self.signaling
                    .send_event(member, ServerEvent::RoomAssigned(assignment))
                    .await;
            }
        }
        self.rooms.insert(room_id, pairing);
    }

    async fn relay(&mut self, peer_id: PeerId, message: SignalingMessage) {
        let Some(room_id) = self.membership.get(&peer_id) else {
            debug!(
                "Dropping {} from {}: not in a room",
                message.kind(),
                peer_id
            );
            return;
        };

        if room_id != &message.room_id {
            debug!(
                "Dropping stale {} from {} for {} (current {})",
                message.kind(),
                peer_id,
                message.room_id,
                room_id
            );
            return;
        }

        let Some(partner) = self
            .rooms
            .get(room_id)
            .and_then(|pairing| pairing.partner_of(&peer_id))
            .cloned()
        else {
            warn!("Room {} has no partner for {}", room_id, peer_id);
            return;
        };

        debug!("Relaying {} in {} to {}", message.kind(), room_id, partner);
        self.signaling
            .send_event(&partner, ServerEvent::SignalingMessage(message))
            .await;
    }

    /// Destroys `room_id` on behalf of `leaver`; the other member is told.
    async fn close_room(&mut self, room_id: &RoomId, leaver: &PeerId) {
        let Some(pairing) = self.rooms.remove(room_id) else {
            return;
        };

        self.membership.remove(&pairing.initiator);
        self.membership.remove(&pairing.responder);
        info!("Room {} closed by {}", room_id, leaver);

        if let Some(partner) = pairing.partner_of(leaver) {
            self.signaling
                .send_event(partner, ServerEvent::PartnerLeft)
                .await;
        }
    }

    /// Removes every trace of `peer_id`.
    async fn forget(&mut self, peer_id: &PeerId) {
        self.remove_waiter(peer_id);
        if let Some(room_id) = self.membership.get(peer_id).cloned() {
            self.close_room(&room_id, peer_id).await;
        }
    }

    fn remove_waiter(&mut self, peer_id: &PeerId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|w| &w.peer_id != peer_id);
        self.waiting.len() != before
    }
}
