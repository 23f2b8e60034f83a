use clap::Parser;
use duet_core::IceServerConfig;
use duet_core::utils::default_ice_servers;
use std::net::SocketAddr;

/// Rendezvous authority settings. Every flag falls back to an environment
/// variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "duet-server", version, about = "Rendezvous authority for one-to-one calls")]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    #[arg(long, env = "DUET_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// STUN URL announced to participants. Repeatable.
    #[arg(long = "stun", env = "DUET_STUN", value_delimiter = ',')]
    pub stun: Vec<String>,

    #[arg(long, env = "DUET_TURN")]
    pub turn: Option<String>,

    #[arg(long, env = "DUET_TURN_USERNAME", requires = "turn")]
    pub turn_username: Option<String>,

    #[arg(long, env = "DUET_TURN_CREDENTIAL", requires = "turn")]
    pub turn_credential: Option<String>,

    /// Capacity of the lobby command queue.
    #[arg(long, env = "DUET_COMMAND_CAPACITY", default_value_t = 256)]
    pub command_capacity: usize,
}

impl ServerConfig {
    /// What `ice-config` announces. Public STUN when nothing is configured.
    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        let mut servers = Vec::new();

        if !self.stun.is_empty() {
            servers.push(IceServerConfig {
                urls: self.stun.clone(),
                username: None,
                credential: None,
            });
        }

        if let Some(turn) = &self.turn {
            servers.push(IceServerConfig {
                urls: vec![turn.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }

        if servers.is_empty() {
            return default_ice_servers();
        }
        servers
    }
}
