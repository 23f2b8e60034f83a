use crate::error::SignalingError;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Connectivity candidate in the shape browsers produce (`RTCIceCandidateInit`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate(IceCandidate),
}

/// A signaling payload scoped to the Room it belongs to.
///
/// On the wire this is `{roomId, kind, payload}`; decoding validates that the
/// payload actually matches `kind`, so a message that reaches the coordinator
/// is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireSignal", into = "WireSignal")]
pub struct SignalingMessage {
    pub room_id: RoomId,
    pub payload: SignalPayload,
}

impl SignalingMessage {
    pub fn offer(room_id: RoomId, sdp: impl Into<String>) -> Self {
        Self {
            room_id,
            payload: SignalPayload::Offer { sdp: sdp.into() },
        }
    }

    pub fn answer(room_id: RoomId, sdp: impl Into<String>) -> Self {
        Self {
            room_id,
            payload: SignalPayload::Answer { sdp: sdp.into() },
        }
    }

    pub fn candidate(room_id: RoomId, candidate: IceCandidate) -> Self {
        Self {
            room_id,
            payload: SignalPayload::IceCandidate(candidate),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate(_) => "candidate",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSignal {
    room_id: RoomId,
    kind: SignalKind,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct SdpPayload {
    sdp: String,
}

fn parse_sdp(payload: Value) -> Result<String, SignalingError> {
    let SdpPayload { sdp } = serde_json::from_value(payload)
        .map_err(|e| SignalingError::MalformedPayload(e.to_string()))?;
    if sdp.trim().is_empty() {
        return Err(SignalingError::MalformedPayload(
            "empty session description".to_owned(),
        ));
    }
    Ok(sdp)
}

impl TryFrom<WireSignal> for SignalingMessage {
    type Error = SignalingError;

    fn try_from(wire: WireSignal) -> Result<Self, Self::Error> {
        let payload = match wire.kind {
            SignalKind::Offer => SignalPayload::Offer {
                sdp: parse_sdp(wire.payload)?,
            },
            SignalKind::Answer => SignalPayload::Answer {
                sdp: parse_sdp(wire.payload)?,
            },
            SignalKind::Candidate => SignalPayload::IceCandidate(
                serde_json::from_value(wire.payload)
                    .map_err(|e| SignalingError::MalformedPayload(e.to_string()))?,
            ),
        };

        Ok(Self {
            room_id: wire.room_id,
            payload,
        })
    }
}

impl From<SignalingMessage> for WireSignal {
    fn from(msg: SignalingMessage) -> Self {
        let mut body = Map::new();
        let kind = match msg.payload {
            SignalPayload::Offer { sdp } => {
                body.insert("sdp".into(), Value::String(sdp));
                SignalKind::Offer
            }
            SignalPayload::Answer { sdp } => {
                body.insert("sdp".into(), Value::String(sdp));
                SignalKind::Answer
            }
            SignalPayload::IceCandidate(c) => {
                body.insert("candidate".into(), Value::String(c.candidate));
                if let Some(mid) = c.sdp_mid {
                    body.insert("sdpMid".into(), Value::String(mid));
                }
                if let Some(idx) = c.sdp_m_line_index {
                    body.insert("sdpMLineIndex".into(), Value::from(idx));
                }
                SignalKind::Candidate
            }
        };

        Self {
            room_id: msg.room_id,
            kind,
            payload: Value::Object(body),
        }
    }
}
