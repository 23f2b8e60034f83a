mod event;
mod peer;
mod role;
mod room;
mod signaling;
mod state;

pub use event::{ClientEvent, MatchCriteria, RoomAssignment, ServerEvent};
pub use peer::PeerId;
pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SignalPayload, SignalingMessage};
pub use state::PeerConnectionState;
