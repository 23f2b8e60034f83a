use anyhow::{Context, Result};
use clap::Parser;
use duet_server::{Lobby, LobbyCommand, ServerConfig, SignalingService, serve};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    let ice_servers = config.ice_servers();
    info!("Announcing {} ICE server entries", ice_servers.len());

    // Signaling writes commands here, the lobby reads them.
    let (cmd_tx, cmd_rx) = mpsc::channel::<LobbyCommand>(config.command_capacity);
    let signaling = SignalingService::new(cmd_tx, ice_servers);

    let lobby = Lobby::new(cmd_rx, Box::new(signaling.clone()));
    tokio::spawn(lobby.run());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Rendezvous listening on http://{}", config.bind);

    serve(listener, signaling)
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
