use anyhow::Result;
use async_trait::async_trait;
use duet_core::ClientEvent;

/// Outbound half of the rendezvous channel. Inbound `ServerEvent`s are
/// delivered on an mpsc receiver handed to the coordinator.
#[async_trait]
pub trait RendezvousChannel: Send + Sync {
    async fn emit(&self, event: ClientEvent) -> Result<()>;
}
