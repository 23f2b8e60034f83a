use crate::model::RoomId;
use thiserror::Error;

/// Failure to obtain the local capture stream. Surfaced to the user, who can
/// retry the permission prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("capture permission denied by the user")]
    Denied,
    #[error("no camera or microphone available")]
    DeviceUnavailable,
}

/// Problems with an inbound signaling message. Recovered locally: the message
/// is dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("message for room {received} does not match the tracked room")]
    StaleRoom {
        received: RoomId,
        current: Option<RoomId>,
    },
    #[error("malformed signaling payload: {0}")]
    MalformedPayload(String),
    #[error("{operation} is not valid in the current negotiation state")]
    OutOfOrderState { operation: &'static str },
}

/// Terminal connection outcomes. Always lead to teardown and a return to
/// room search; never fatal to the coordinator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("ICE negotiation failed")]
    IceFailed,
    #[error("connection was not established in time")]
    Timeout,
    #[error("connection closed by the transport")]
    Closed,
}
