use crate::config::PeerConfig;
use crate::coordinator::{CoordinatorCommand, CoordinatorReport, SignalingCoordinator};
use crate::media::{CaptureDevice, LocalMediaSource, LocalMediaState};
use crate::rendezvous::{RendezvousChannel, WsRendezvousChannel};
use crate::transport::{TransportFactory, WebRtcTransportFactory};
use anyhow::{Context, Result};
use duet_core::{MatchCriteria, PeerId, ServerEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// A running participant: one coordinator task plus the handles to drive it.
pub struct Participant {
    peer_id: PeerId,
    media: Arc<LocalMediaSource>,
    commands: mpsc::Sender<CoordinatorCommand>,
    reports: mpsc::UnboundedReceiver<CoordinatorReport>,
    task: JoinHandle<()>,
}

impl Participant {
    /// Connects to the rendezvous authority at `rendezvous_url` and starts a
    /// coordinator backed by real `webrtc` peer connections.
    pub async fn connect(
        rendezvous_url: &str,
        config: PeerConfig,
        device: Arc<dyn CaptureDevice>,
    ) -> Result<Self> {
        let peer_id = PeerId::new();
        let (channel, inbound) = WsRendezvousChannel::connect(rendezvous_url, &peer_id)
            .await
            .context("Failed to reach rendezvous authority")?;

        let media = Arc::new(LocalMediaSource::new(device, config.constraints));
        Ok(Self::spawn(
            peer_id,
            config,
            media,
            Arc::new(WebRtcTransportFactory::new()),
            Arc::new(channel),
            inbound,
        ))
    }

    /// Wires an already connected channel and a transport factory together.
    pub fn spawn(
        peer_id: PeerId,
        config: PeerConfig,
        media: Arc<LocalMediaSource>,
        factory: Arc<dyn TransportFactory>,
        channel: Arc<dyn RendezvousChannel>,
        inbound: mpsc::Receiver<ServerEvent>,
    ) -> Self {
        let (coordinator, reports) =
            SignalingCoordinator::new(config, media.clone(), factory, channel);
        let (commands, commands_rx) = mpsc::channel(32);

        let task = tokio::spawn(coordinator.run(inbound, commands_rx));
        info!("Participant {} started", peer_id);

        Self {
            peer_id,
            media,
            commands,
            reports,
            task,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn media_state(&self) -> watch::Receiver<LocalMediaState> {
        self.media.subscribe()
    }

    pub async fn start(&self, criteria: MatchCriteria) -> Result<()> {
        self.send(CoordinatorCommand::start(criteria)).await
    }

    pub async fn skip(&self) -> Result<()> {
        self.send(CoordinatorCommand::Skip).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(CoordinatorCommand::Stop).await
    }

    pub async fn send(&self, command: CoordinatorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Coordinator task is gone")
    }

    /// `None` once the coordinator has shut down.
    pub async fn next_report(&mut self) -> Option<CoordinatorReport> {
        self.reports.recv().await
    }

    /// Stops the coordinator and waits for it to release everything.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.commands);
        self.task.await.context("Coordinator task panicked")?;
        info!("Participant {} stopped", self.peer_id);
        Ok(())
    }
}
