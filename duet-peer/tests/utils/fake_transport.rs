use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig, PeerConnectionState};
use duet_peer::{
    MediaStream, MediaTrack, PeerConnectionHandle, PeerTransport, SdpKind, TrackKind,
    TransportEvent, TransportEventSink, TransportFactory,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Calls made on a fake transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    AddTrack(TrackKind),
    CreateOffer,
    CreateAnswer,
    SetRemote(SdpKind, String),
    AddCandidate(String),
    Close,
}

#[derive(Default)]
struct TransportLog {
    ops: Vec<TransportOp>,
    remote_set: bool,
}

/// Test-side view of one created transport.
#[derive(Clone)]
pub struct TransportSpy {
    sink: TransportEventSink,
    ice_servers: Vec<IceServerConfig>,
    log: Arc<Mutex<TransportLog>>,
}

impl TransportSpy {
    pub fn handle(&self) -> PeerConnectionHandle {
        self.sink.handle()
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    /// Raise a connection-state callback as the real transport would.
    pub async fn emit_state(&self, state: PeerConnectionState) {
        self.sink.emit(TransportEvent::StateChanged(state)).await;
    }

    pub async fn emit_candidate(&self, candidate: &str) {
        self.sink
            .emit(TransportEvent::LocalCandidate(IceCandidate::new(candidate)))
            .await;
    }

    pub async fn ops(&self) -> Vec<TransportOp> {
        self.log.lock().await.ops.clone()
    }

    pub async fn applied_candidates(&self) -> Vec<String> {
        self.log
            .lock()
            .await
            .ops
            .iter()
            .filter_map(|op| match op {
                TransportOp::AddCandidate(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn is_closed(&self) -> bool {
        self.log.lock().await.ops.contains(&TransportOp::Close)
    }
}

/// Factory producing in-memory transports.
///
/// SDP `"broken"` is refused by `set_remote_description`. Candidates that are
/// empty or `"malformed"` are refused, as is any candidate before the remote
/// description.
#[derive(Clone, Default)]
pub struct FakeTransportFactory {
    created: Arc<Mutex<Vec<TransportSpy>>>,
}

impl FakeTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn created(&self) -> usize {
        self.created.lock().await.len()
    }

    /// Spy on the `index`-th transport created (0-based).
    pub async fn spy(&self, index: usize) -> TransportSpy {
        self.created.lock().await[index].clone()
    }

    pub async fn last_spy(&self) -> TransportSpy {
        self.created
            .lock()
            .await
            .last()
            .cloned()
            .expect("no transport created yet")
    }
}

#[async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: TransportEventSink,
    ) -> Result<Box<dyn PeerTransport>> {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        let handle = events.handle();
        self.created.lock().await.push(TransportSpy {
            sink: events,
            ice_servers: ice_servers.to_vec(),
            log: log.clone(),
        });
        Ok(Box::new(FakeTransport { handle, log }))
    }
}

struct FakeTransport {
    handle: PeerConnectionHandle,
    log: Arc<Mutex<TransportLog>>,
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn add_track(&self, _stream: &MediaStream, track: &MediaTrack) -> Result<()> {
        self.log.lock().await.ops.push(TransportOp::AddTrack(track.kind));
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.log.lock().await.ops.push(TransportOp::CreateOffer);
        Ok(format!("v=0 offer from {}", self.handle))
    }

    async fn create_answer(&self) -> Result<String> {
        let mut log = self.log.lock().await;
        if !log.remote_set {
            bail!("no remote offer");
        }
        log.ops.push(TransportOp::CreateAnswer);
        Ok(format!("v=0 answer from {}", self.handle))
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        if sdp == "broken" {
            return Err(anyhow!("unparsable session description"));
        }
        let mut log = self.log.lock().await;
        log.remote_set = true;
        log.ops.push(TransportOp::SetRemote(kind, sdp));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let mut log = self.log.lock().await;
        if !log.remote_set {
            bail!("remote description not set");
        }
        if candidate.candidate.is_empty() || candidate.candidate == "malformed" {
            bail!("malformed candidate {:?}", candidate.candidate);
        }
        log.ops.push(TransportOp::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().await.ops.push(TransportOp::Close);
        Ok(())
    }
}
