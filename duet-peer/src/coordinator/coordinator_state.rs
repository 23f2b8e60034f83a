use duet_core::{
    ConnectionError, PeerId, PermissionError, Role, RoomAssignment, RoomId, SignalingError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    AwaitingMedia,
    Searching,
    Negotiating {
        room_id: RoomId,
        role: Role,
        partner_id: PeerId,
    },
    Active {
        room_id: RoomId,
        partner_id: PeerId,
    },
    TearingDown,
    /// Capture was refused. Left only by an explicit new `Start`.
    Blocked(PermissionError),
}

impl CoordinatorState {
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::Negotiating { room_id, .. } | Self::Active { room_id, .. } => Some(room_id),
            _ => None,
        }
    }

    pub fn in_room(&self) -> bool {
        self.room_id().is_some()
    }
}

/// Status reported upward to whoever drives the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorReport {
    StateChanged(CoordinatorState),
    PartnerFound(RoomAssignment),
    /// Transient: the Room was torn down and search resumes.
    ConnectionLost {
        room_id: RoomId,
        error: ConnectionError,
    },
    Blocked(PermissionError),
    SignalDropped(SignalingError),
}
