use duet_core::{RoomId, SignalingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiatorError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    /// A connection for another Room is still open; it must be closed first.
    #[error("a connection for room {active} is still open")]
    SessionBusy { active: RoomId },

    #[error("no connection is open")]
    NoSession,

    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
}
