use duet_core::{IceCandidate, PeerConnectionState, RoomId};
use std::fmt;

/// Identifies one peer connection for its whole life. Handles are never
/// reused, so events from a closed connection can always be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerConnectionHandle(pub(crate) u64);

impl fmt::Display for PeerConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pc-{}", self.0)
    }
}

/// Observable output of the negotiator.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiatorEvent {
    /// A local candidate to relay to the partner, tagged with its Room.
    LocalCandidate {
        handle: PeerConnectionHandle,
        room_id: RoomId,
        candidate: IceCandidate,
    },
    StateChanged {
        handle: PeerConnectionHandle,
        room_id: RoomId,
        state: PeerConnectionState,
    },
}

/// What happened to a remote candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    Applied,
    /// Held until the remote description is set.
    Buffered,
    /// Malformed, duplicate or arrived after the connection ended; logged and dropped.
    Rejected,
}
