use crate::media::MediaStream;
use crate::negotiator::{
    CandidateDisposition, NegotiatorError, NegotiatorEvent, PeerConnectionHandle,
};
use crate::transport::{
    PeerTransport, SdpKind, TransportEvent, TransportEventSink, TransportFactory,
    TransportSignal,
};
use duet_core::utils::default_ice_servers;
use duet_core::{
    ConnectionError, IceCandidate, IceServerConfig, PeerConnectionState, Role, RoomId,
    SignalingError,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Remote candidates held while the remote description is still unknown.
/// Anything past this is rejected.
pub const MAX_PENDING_CANDIDATES: usize = 64;

struct Session {
    handle: PeerConnectionHandle,
    room_id: RoomId,
    role: Role,
    state: PeerConnectionState,
    transport: Box<dyn PeerTransport>,
    remote_description_set: bool,
    local_offer_sent: bool,
    answer_applied: bool,
    pending_candidates: Vec<IceCandidate>,
}

/// Owns at most one peer connection and drives it through offer/answer.
///
/// Transport callbacks arrive on an internal channel; the owner pulls them
/// with [`recv_transport_signal`](Self::recv_transport_signal) and feeds them
/// back through [`on_transport_signal`](Self::on_transport_signal), so every
/// state mutation happens on the owner's task.
pub struct SessionNegotiator {
    factory: Arc<dyn TransportFactory>,
    ice_servers: Vec<IceServerConfig>,
    session: Option<Session>,
    next_handle: u64,
    signal_tx: mpsc::Sender<TransportSignal>,
    signal_rx: mpsc::Receiver<TransportSignal>,
    observer: mpsc::UnboundedSender<NegotiatorEvent>,
}

impl SessionNegotiator {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        ice_servers: Vec<IceServerConfig>,
    ) -> (Self, mpsc::UnboundedReceiver<NegotiatorEvent>) {
        let (signal_tx, signal_rx) = mpsc::channel(256);
        let (observer, events) = mpsc::unbounded_channel();

        let mut negotiator = Self {
            factory,
            ice_servers: Vec::new(),
            session: None,
            next_handle: 0,
            signal_tx,
            signal_rx,
            observer,
        };
        negotiator.set_ice_servers(ice_servers);
        (negotiator, events)
    }

    /// Applies to connections opened afterwards.
    pub fn set_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        self.ice_servers = if ice_servers.is_empty() {
            default_ice_servers()
        } else {
            ice_servers
        };
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn handle(&self) -> Option<PeerConnectionHandle> {
        self.session.as_ref().map(|s| s.handle)
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.session.as_ref().map(|s| &s.room_id)
    }

    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|s| s.role)
    }

    /// `closed` when no connection is open.
    pub fn state(&self) -> PeerConnectionState {
        self.session
            .as_ref()
            .map_or(PeerConnectionState::Closed, |s| s.state)
    }

    pub fn pending_candidates(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |s| s.pending_candidates.len())
    }

    /// Creates the connection for `room_id` and attaches the local tracks
    /// before any signaling can happen. Re-opening the current Room returns
    /// the existing handle.
    pub async fn open(
        &mut self,
        room_id: RoomId,
        role: Role,
        stream: &MediaStream,
    ) -> Result<PeerConnectionHandle, NegotiatorError> {
        if let Some(session) = &self.session {
            if session.room_id == room_id {
                return Ok(session.handle);
            }
            return Err(NegotiatorError::SessionBusy {
                active: session.room_id.clone(),
            });
        }

        self.next_handle += 1;
        let handle = PeerConnectionHandle(self.next_handle);
        let sink = TransportEventSink::new(handle, self.signal_tx.clone());
        let transport = self.factory.create(&self.ice_servers, sink).await?;

        for track in stream.tracks() {
            if let Err(e) = transport.add_track(stream, track).await {
                let _ = transport.close().await;
                return Err(e.into());
            }
        }

        info!(
            "Opened {} for room {} as {} ({} local tracks)",
            handle,
            room_id,
            role,
            stream.tracks().len()
        );

        self.session = Some(Session {
            handle,
            room_id,
            role,
            state: PeerConnectionState::New,
            transport,
            remote_description_set: false,
            local_offer_sent: false,
            answer_applied: false,
            pending_candidates: Vec::new(),
        });

        Ok(handle)
    }

    pub async fn create_offer(&mut self) -> Result<String, NegotiatorError> {
        let session = self.session.as_mut().ok_or(NegotiatorError::NoSession)?;
        if session.role != Role::Initiator
            || session.state != PeerConnectionState::New
            || session.local_offer_sent
        {
            return Err(out_of_order("create_offer"));
        }

        let sdp = session.transport.create_offer().await?;
        session.local_offer_sent = true;
        transition(session, &self.observer, PeerConnectionState::Connecting);
        Ok(sdp)
    }

    /// Applies the partner's offer and returns the local answer.
    pub async fn accept_offer(&mut self, sdp: String) -> Result<String, NegotiatorError> {
        let session = self.session.as_mut().ok_or(NegotiatorError::NoSession)?;
        if session.role != Role::Responder
            || session.state != PeerConnectionState::New
            || session.remote_description_set
        {
            return Err(out_of_order("accept_offer"));
        }

        session
            .transport
            .set_remote_description(SdpKind::Offer, sdp)
            .await?;
        session.remote_description_set = true;
        flush_candidates(session).await;

        let answer = session.transport.create_answer().await?;
        transition(session, &self.observer, PeerConnectionState::Connecting);
        Ok(answer)
    }

    pub async fn accept_answer(&mut self, sdp: String) -> Result<(), NegotiatorError> {
        let session = self.session.as_mut().ok_or(NegotiatorError::NoSession)?;
        if session.role != Role::Initiator
            || session.state != PeerConnectionState::Connecting
            || !session.local_offer_sent
            || session.answer_applied
        {
            return Err(out_of_order("accept_answer"));
        }

        session
            .transport
            .set_remote_description(SdpKind::Answer, sdp)
            .await?;
        session.answer_applied = true;
        session.remote_description_set = true;
        flush_candidates(session).await;
        Ok(())
    }

    /// Buffers the candidate until the remote description is known, applies
    /// it otherwise. Failures to apply are logged, never returned.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition, NegotiatorError> {
        let session = self.session.as_mut().ok_or(NegotiatorError::NoSession)?;

        if session.state.is_terminal() {
            debug!("Dropping candidate for {} in state {}", session.handle, session.state);
            return Ok(CandidateDisposition::Rejected);
        }

        if !session.remote_description_set {
            if session.pending_candidates.len() >= MAX_PENDING_CANDIDATES {
                warn!(
                    "Rejecting remote candidate for {}: {} already pending",
                    session.handle, MAX_PENDING_CANDIDATES
                );
                return Ok(CandidateDisposition::Rejected);
            }
            session.pending_candidates.push(candidate);
            debug!(
                "Buffered remote candidate for {} ({} pending)",
                session.handle,
                session.pending_candidates.len()
            );
            return Ok(CandidateDisposition::Buffered);
        }

        match session.transport.add_ice_candidate(candidate).await {
            Ok(()) => Ok(CandidateDisposition::Applied),
            Err(e) => {
                warn!("Ignoring remote candidate for {}: {:#}", session.handle, e);
                Ok(CandidateDisposition::Rejected)
            }
        }
    }

    /// Marks the connection as failed. Terminal; retry policy is the caller's.
    pub fn fail(&mut self, reason: ConnectionError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        warn!("{} for room {} failed: {}", session.handle, session.room_id, reason);
        transition(session, &self.observer, PeerConnectionState::Failed);
    }

    /// Releases the connection and any buffered candidates. Safe from any
    /// state and when nothing is open.
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.pending_candidates.clear();
        if let Err(e) = session.transport.close().await {
            warn!("Error while closing {}: {:#}", session.handle, e);
        }

        if session.state != PeerConnectionState::Closed {
            session.state = PeerConnectionState::Closed;
            let _ = self.observer.send(NegotiatorEvent::StateChanged {
                handle: session.handle,
                room_id: session.room_id.clone(),
                state: PeerConnectionState::Closed,
            });
        }
        info!("Closed {} for room {}", session.handle, session.room_id);
    }

    pub async fn recv_transport_signal(&mut self) -> Option<TransportSignal> {
        self.signal_rx.recv().await
    }

    pub fn try_recv_transport_signal(&mut self) -> Option<TransportSignal> {
        self.signal_rx.try_recv().ok()
    }

    /// Applies a transport callback. Callbacks from connections other than
    /// the open one are dropped.
    pub fn on_transport_signal(&mut self, signal: TransportSignal) {
        let Some(session) = self.session.as_mut() else {
            debug!("Dropping {:?} from {}: no open connection", signal.event, signal.handle);
            return;
        };
        if session.handle != signal.handle {
            debug!(
                "Dropping {:?} from stale {} (current {})",
                signal.event, signal.handle, session.handle
            );
            return;
        }

        match signal.event {
            TransportEvent::LocalCandidate(candidate) => {
                if session.state.is_terminal() {
                    return;
                }
                let _ = self.observer.send(NegotiatorEvent::LocalCandidate {
                    handle: session.handle,
                    room_id: session.room_id.clone(),
                    candidate,
                });
            }
            TransportEvent::StateChanged(state) => {
                transition(session, &self.observer, state);
            }
        }
    }
}

fn out_of_order(operation: &'static str) -> NegotiatorError {
    SignalingError::OutOfOrderState { operation }.into()
}

fn transition(
    session: &mut Session,
    observer: &mpsc::UnboundedSender<NegotiatorEvent>,
    state: PeerConnectionState,
) {
    if session.state == state || session.state.is_terminal() {
        return;
    }

    debug!("{}: {} -> {}", session.handle, session.state, state);
    session.state = state;
    let _ = observer.send(NegotiatorEvent::StateChanged {
        handle: session.handle,
        room_id: session.room_id.clone(),
        state,
    });
}

async fn flush_candidates(session: &mut Session) {
    let pending = std::mem::take(&mut session.pending_candidates);
    if pending.is_empty() {
        return;
    }

    debug!("Flushing {} buffered candidates for {}", pending.len(), session.handle);
    for candidate in pending {
        if let Err(e) = session.transport.add_ice_candidate(candidate).await {
            warn!("Ignoring buffered candidate for {}: {:#}", session.handle, e);
        }
    }
}
