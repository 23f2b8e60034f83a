use crate::model::peer::PeerId;
use crate::model::role::Role;
use crate::model::room::RoomId;
use crate::model::signaling::{IceServerConfig, SignalingMessage};
use serde::{Deserialize, Serialize};

/// Pairing preferences sent with `find-partner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MatchCriteria {
    /// Two participants can be paired when either side has no preference or
    /// they share at least one tag.
    pub fn is_compatible(&self, other: &MatchCriteria) -> bool {
        if self.tags.is_empty() || other.tags.is_empty() {
            return true;
        }
        self.tags
            .iter()
            .any(|t| other.tags.iter().any(|o| o.eq_ignore_ascii_case(t)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAssignment {
    pub room_id: RoomId,
    pub role: Role,
    pub partner_id: PeerId,
}

/// Events delivered by the rendezvous authority to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Welcome { peer_id: PeerId },
    #[serde(rename_all = "camelCase")]
    IceConfig { ice_servers: Vec<IceServerConfig> },
    RoomAssigned(RoomAssignment),
    SignalingMessage(SignalingMessage),
    PartnerLeft,
    ForcedDisconnect,
}

/// Requests a participant sends to the rendezvous authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientEvent {
    FindPartner {
        #[serde(default)]
        criteria: MatchCriteria,
    },
    /// Withdraw from the waiting queue without entering a Room.
    CancelSearch,
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },
    SignalingMessage(SignalingMessage),
}
