use crate::media::{MediaStream, MediaTrack};
use crate::transport::TransportEventSink;
use anyhow::Result;
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One real-time connection (WebRTC-compatible).
///
/// `create_offer` / `create_answer` also install the result as the local
/// description.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_track(&self, stream: &MediaStream, track: &MediaTrack) -> Result<()>;

    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: TransportEventSink,
    ) -> Result<Box<dyn PeerTransport>>;
}
