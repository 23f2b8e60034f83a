use crate::media::MediaConstraints;
use duet_core::IceServerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Participant-side settings.
///
/// An empty `ice_servers` list means "use whatever the rendezvous authority
/// announces", falling back to public STUN servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub connect_timeout_secs: u64,
    pub constraints: MediaConstraints,
}

impl PeerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            connect_timeout_secs: 20,
            constraints: MediaConstraints::default(),
        }
    }
}
