use duet_core::{PeerId, Role, RoomAssignment, RoomId};

/// The two members of a Room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub initiator: PeerId,
    pub responder: PeerId,
}

impl Pairing {
    pub fn new(initiator: PeerId, responder: PeerId) -> Self {
        Self {
            initiator,
            responder,
        }
    }

    /// Initiator first.
    pub fn members(&self) -> [&PeerId; 2] {
        [&self.initiator, &self.responder]
    }

    pub fn partner_of(&self, peer_id: &PeerId) -> Option<&PeerId> {
        if &self.initiator == peer_id {
            Some(&self.responder)
        } else if &self.responder == peer_id {
            Some(&self.initiator)
        } else {
            None
        }
    }

    pub fn role_of(&self, peer_id: &PeerId) -> Option<Role> {
        if &self.initiator == peer_id {
            Some(Role::Initiator)
        } else if &self.responder == peer_id {
            Some(Role::Responder)
        } else {
            None
        }
    }

    /// The `room-assigned` payload for one member, `None` for outsiders.
    pub fn assignment_for(&self, room_id: &RoomId, peer_id: &PeerId) -> Option<RoomAssignment> {
        Some(RoomAssignment {
            room_id: room_id.clone(),
            role: self.role_of(peer_id)?,
            partner_id: self.partner_of(peer_id)?.clone(),
        })
    }
}
