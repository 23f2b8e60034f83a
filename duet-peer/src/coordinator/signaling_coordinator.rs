use crate::config::PeerConfig;
use crate::coordinator::{CoordinatorCommand, CoordinatorInput, CoordinatorReport, CoordinatorState};
use crate::media::LocalMediaSource;
use crate::negotiator::{NegotiatorError, NegotiatorEvent, PeerConnectionHandle, SessionNegotiator};
use crate::rendezvous::RendezvousChannel;
use crate::transport::TransportFactory;
use duet_core::{
    ClientEvent, ConnectionError, MatchCriteria, PeerConnectionState, Role, RoomAssignment,
    RoomId, ServerEvent, SignalPayload, SignalingError, SignalingMessage,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
struct SearchIntent {
    criteria: MatchCriteria,
    keep_searching: bool,
}

/// Single actor that pairs the local media source with one negotiated
/// connection per Room.
///
/// Inputs are processed one at a time to completion. Room changes always go
/// through `teardown_room`, which closes the connection but keeps the camera.
pub struct SignalingCoordinator {
    config: PeerConfig,
    media: Arc<LocalMediaSource>,
    negotiator: SessionNegotiator,
    negotiator_events: mpsc::UnboundedReceiver<NegotiatorEvent>,
    channel: Arc<dyn RendezvousChannel>,
    state: CoordinatorState,
    intent: Option<SearchIntent>,
    out_of_order_strikes: u8,
    connect_deadline: Option<(PeerConnectionHandle, Instant)>,
    reports: mpsc::UnboundedSender<CoordinatorReport>,
}

impl SignalingCoordinator {
    pub fn new(
        config: PeerConfig,
        media: Arc<LocalMediaSource>,
        factory: Arc<dyn TransportFactory>,
        channel: Arc<dyn RendezvousChannel>,
    ) -> (Self, mpsc::UnboundedReceiver<CoordinatorReport>) {
        let (negotiator, negotiator_events) =
            SessionNegotiator::new(factory, config.ice_servers.clone());
        let (reports, reports_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            config,
            media,
            negotiator,
            negotiator_events,
            channel,
            state: CoordinatorState::Idle,
            intent: None,
            out_of_order_strikes: 0,
            connect_deadline: None,
            reports,
        };
        (coordinator, reports_rx)
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn negotiator(&self) -> &SessionNegotiator {
        &self.negotiator
    }

    pub fn media(&self) -> &Arc<LocalMediaSource> {
        &self.media
    }

    /// Event loop. Ends when either the command or the rendezvous channel
    /// closes, releasing everything on the way out.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<ServerEvent>,
        mut commands: mpsc::Receiver<CoordinatorCommand>,
    ) {
        info!("Signaling coordinator started");

        loop {
            let deadline = self.connect_deadline;

            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(c) => self.handle(CoordinatorInput::Command(c)).await,
                        None => {
                            info!("Command channel closed. Shutting down coordinator.");
                            break;
                        }
                    }
                }

                evt = inbound.recv() => {
                    match evt {
                        Some(e) => self.handle(CoordinatorInput::Channel(e)).await,
                        None => {
                            warn!("Rendezvous channel closed");
                            break;
                        }
                    }
                }

                Some(signal) = self.negotiator.recv_transport_signal() => {
                    self.negotiator.on_transport_signal(signal);
                }

                Some(event) = self.negotiator_events.recv() => {
                    self.handle(CoordinatorInput::Negotiator(event)).await;
                }

                _ = deadline_elapsed(deadline) => {
                    if let Some((handle, _)) = deadline {
                        self.handle(CoordinatorInput::ConnectTimeout { handle }).await;
                    }
                }
            }
        }

        self.stop().await;
        info!("Signaling coordinator finished");
    }

    /// Drains transport callbacks and negotiator events that are already
    /// queued. `run` does this continuously; only callers stepping the
    /// coordinator through `handle` by hand need it.
    #[doc(hidden)]
    pub async fn settle(&mut self) {
        loop {
            let mut progressed = false;

            while let Some(signal) = self.negotiator.try_recv_transport_signal() {
                self.negotiator.on_transport_signal(signal);
                progressed = true;
            }
            while let Ok(event) = self.negotiator_events.try_recv() {
                self.handle(CoordinatorInput::Negotiator(event)).await;
                progressed = true;
            }

            if !progressed {
                break;
            }
        }
    }

    pub async fn handle(&mut self, input: CoordinatorInput) {
        match input {
            CoordinatorInput::Command(CoordinatorCommand::Start {
                criteria,
                keep_searching,
            }) => self.start(criteria, keep_searching).await,
            CoordinatorInput::Command(CoordinatorCommand::Skip) => self.skip().await,
            CoordinatorInput::Command(CoordinatorCommand::Stop) => self.stop().await,
            CoordinatorInput::Channel(event) => self.on_channel_event(event).await,
            CoordinatorInput::Negotiator(event) => self.on_negotiator_event(event).await,
            CoordinatorInput::ConnectTimeout { handle } => self.on_connect_timeout(handle).await,
        }
    }

    async fn start(&mut self, criteria: MatchCriteria, keep_searching: bool) {
        if !matches!(self.state, CoordinatorState::Idle | CoordinatorState::Blocked(_)) {
            debug!("Start ignored in state {:?}", self.state);
            return;
        }

        self.intent = Some(SearchIntent {
            criteria,
            keep_searching,
        });

        if !self.media.state().is_granted() {
            self.set_state(CoordinatorState::AwaitingMedia);
        }

        match self.media.acquire().await {
            Ok(_) => self.begin_search().await,
            Err(e) => {
                warn!("Cannot start: {}", e);
                self.intent = None;
                self.set_state(CoordinatorState::Blocked(e.clone()));
                self.report(CoordinatorReport::Blocked(e));
            }
        }
    }

    async fn skip(&mut self) {
        let Some(room_id) = self.state.room_id().cloned() else {
            debug!("Skip ignored in state {:?}", self.state);
            return;
        };

        info!("Skipping room {}", room_id);
        self.teardown_room().await;
        self.emit(ClientEvent::LeaveRoom { room_id }).await;
        self.begin_search().await;
    }

    async fn stop(&mut self) {
        if let Some(room_id) = self.state.room_id().cloned() {
            self.teardown_room().await;
            self.emit(ClientEvent::LeaveRoom { room_id }).await;
        } else if self.state == CoordinatorState::Searching {
            self.emit(ClientEvent::CancelSearch).await;
        }

        self.negotiator.close().await;
        self.media.release();
        self.intent = None;
        self.set_state(CoordinatorState::Idle);
    }

    async fn on_channel_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Welcome { peer_id } => {
                info!("Registered with rendezvous as {}", peer_id);
            }
            ServerEvent::IceConfig { ice_servers } => {
                if self.config.ice_servers.is_empty() {
                    info!("Using {} ICE servers from rendezvous", ice_servers.len());
                    self.negotiator.set_ice_servers(ice_servers);
                }
            }
            ServerEvent::RoomAssigned(assignment) => self.on_room_assigned(assignment).await,
            ServerEvent::SignalingMessage(message) => self.on_signal(message).await,
            ServerEvent::PartnerLeft => self.on_partner_gone(false).await,
            ServerEvent::ForcedDisconnect => self.on_partner_gone(true).await,
        }
    }

    async fn on_room_assigned(&mut self, assignment: RoomAssignment) {
        match &self.state {
            CoordinatorState::Searching => {}
            CoordinatorState::Negotiating { room_id, .. } | CoordinatorState::Active { room_id, .. } => {
                warn!("Reassigned to {} while in {}", assignment.room_id, room_id);
                self.teardown_room().await;
            }
            other => {
                warn!("Refusing room {} in state {:?}", assignment.room_id, other);
                self.emit(ClientEvent::LeaveRoom {
                    room_id: assignment.room_id,
                })
                .await;
                return;
            }
        }

        let Some(stream) = self.media.stream() else {
            warn!("Refusing room {}: no local stream", assignment.room_id);
            self.emit(ClientEvent::LeaveRoom {
                room_id: assignment.room_id,
            })
            .await;
            return;
        };

        let handle = match self
            .negotiator
            .open(assignment.room_id.clone(), assignment.role, &stream)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to open connection for {}: {}", assignment.room_id, e);
                self.emit(ClientEvent::LeaveRoom {
                    room_id: assignment.room_id,
                })
                .await;
                self.resume_search().await;
                return;
            }
        };

        info!(
            "Paired with {} in room {} as {}",
            assignment.partner_id, assignment.room_id, assignment.role
        );
        self.out_of_order_strikes = 0;
        self.connect_deadline = Some((handle, Instant::now() + self.config.connect_timeout()));
        self.set_state(CoordinatorState::Negotiating {
            room_id: assignment.room_id.clone(),
            role: assignment.role,
            partner_id: assignment.partner_id.clone(),
        });
        self.report(CoordinatorReport::PartnerFound(assignment.clone()));

        if assignment.role == Role::Initiator {
            match self.negotiator.create_offer().await {
                Ok(sdp) => {
                    self.send_signal(SignalingMessage::offer(assignment.room_id, sdp))
                        .await
                }
                Err(e) => {
                    error!("Failed to create offer: {}", e);
                    self.abandon_room(ConnectionError::IceFailed).await;
                }
            }
        }
    }

    async fn on_signal(&mut self, message: SignalingMessage) {
        let current = self.negotiator.room_id().cloned();
        if !self.state.in_room() || current.as_ref() != Some(&message.room_id) {
            let err = SignalingError::StaleRoom {
                received: message.room_id,
                current,
            };
            debug!("Discarding {}", err);
            self.report(CoordinatorReport::SignalDropped(err));
            return;
        }

        let kind = message.kind();
        let room_id = message.room_id;

        let result = match message.payload {
            SignalPayload::Offer { sdp } => self.negotiator.accept_offer(sdp).await.map(Some),
            SignalPayload::Answer { sdp } => self.negotiator.accept_answer(sdp).await.map(|_| None),
            SignalPayload::IceCandidate(candidate) => self
                .negotiator
                .add_remote_candidate(candidate)
                .await
                .map(|disposition| {
                    debug!("Remote candidate for {}: {:?}", room_id, disposition);
                    None
                }),
        };

        match result {
            Ok(Some(answer)) => self.send_signal(SignalingMessage::answer(room_id, answer)).await,
            Ok(None) => {}
            Err(NegotiatorError::Signaling(err @ SignalingError::OutOfOrderState { .. })) => {
                self.out_of_order_strikes += 1;
                if self.out_of_order_strikes > 1 {
                    warn!("Repeated out-of-order {} in room {}: {}", kind, room_id, err);
                    self.abandon_room(ConnectionError::IceFailed).await;
                } else {
                    warn!("Dropping out-of-order {} in room {}: {}", kind, room_id, err);
                    self.report(CoordinatorReport::SignalDropped(err));
                }
            }
            Err(e) => {
                error!("Failed to apply remote {} in room {}: {}", kind, room_id, e);
                self.abandon_room(ConnectionError::IceFailed).await;
            }
        }
    }

    /// The authority ended our Room. A forced disconnect also drops us from
    /// its wait queue, so searching has to be re-announced.
    async fn on_partner_gone(&mut self, forced: bool) {
        let reason = if forced { "forced disconnect" } else { "partner left" };
        match &self.state {
            CoordinatorState::Negotiating { room_id, .. } | CoordinatorState::Active { room_id, .. } => {
                info!("Leaving room {}: {}", room_id, reason);
                self.teardown_room().await;
                self.resume_search().await;
            }
            CoordinatorState::Searching if forced => self.resume_search().await,
            other => debug!("Ignoring {} in state {:?}", reason, other),
        }
    }

    async fn on_negotiator_event(&mut self, event: NegotiatorEvent) {
        match event {
            NegotiatorEvent::LocalCandidate {
                handle,
                room_id,
                candidate,
            } => {
                if self.negotiator.handle() != Some(handle) {
                    return;
                }
                self.send_signal(SignalingMessage::candidate(room_id, candidate))
                    .await;
            }
            NegotiatorEvent::StateChanged {
                handle,
                room_id,
                state,
            } => {
                if self.negotiator.handle() != Some(handle) {
                    debug!("Ignoring {} from closed {}", state, handle);
                    return;
                }
                self.on_connection_state(handle, room_id, state).await;
            }
        }
    }

    async fn on_connection_state(
        &mut self,
        handle: PeerConnectionHandle,
        room_id: RoomId,
        state: PeerConnectionState,
    ) {
        match state {
            PeerConnectionState::Connected => {
                self.connect_deadline = None;
                if let CoordinatorState::Negotiating { partner_id, .. } = &self.state {
                    let partner_id = partner_id.clone();
                    info!("Room {} is active", room_id);
                    self.set_state(CoordinatorState::Active {
                        room_id,
                        partner_id,
                    });
                }
            }
            PeerConnectionState::Disconnected => {
                if matches!(self.state, CoordinatorState::Active { .. }) {
                    warn!("Room {} lost connectivity, waiting for recovery", room_id);
                    self.connect_deadline =
                        Some((handle, Instant::now() + self.config.connect_timeout()));
                }
            }
            PeerConnectionState::Failed => self.abandon_room(ConnectionError::IceFailed).await,
            PeerConnectionState::Closed => self.abandon_room(ConnectionError::Closed).await,
            PeerConnectionState::New | PeerConnectionState::Connecting => {}
        }
    }

    async fn on_connect_timeout(&mut self, handle: PeerConnectionHandle) {
        let armed = matches!(self.connect_deadline, Some((h, _)) if h == handle);
        if !armed || self.negotiator.handle() != Some(handle) {
            return;
        }
        self.abandon_room(ConnectionError::Timeout).await;
    }

    /// Connection-failure exit: tell the authority, report, search again.
    async fn abandon_room(&mut self, error: ConnectionError) {
        let Some(room_id) = self.negotiator.room_id().cloned() else {
            return;
        };

        self.negotiator.fail(error);
        self.report(CoordinatorReport::ConnectionLost {
            room_id: room_id.clone(),
            error,
        });
        self.teardown_room().await;
        self.emit(ClientEvent::LeaveRoom { room_id }).await;
        self.resume_search().await;
    }

    async fn teardown_room(&mut self) {
        self.set_state(CoordinatorState::TearingDown);
        self.negotiator.close().await;
        self.connect_deadline = None;
        self.out_of_order_strikes = 0;
    }

    async fn resume_search(&mut self) {
        match &self.intent {
            Some(intent) if intent.keep_searching => self.begin_search().await,
            _ => self.set_state(CoordinatorState::Idle),
        }
    }

    async fn begin_search(&mut self) {
        let criteria = self
            .intent
            .as_ref()
            .map(|i| i.criteria.clone())
            .unwrap_or_default();
        self.set_state(CoordinatorState::Searching);
        self.emit(ClientEvent::FindPartner { criteria }).await;
    }

    async fn send_signal(&self, message: SignalingMessage) {
        debug!("Sending {} for room {}", message.kind(), message.room_id);
        self.emit(ClientEvent::SignalingMessage(message)).await;
    }

    async fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.channel.emit(event).await {
            error!("Failed to reach rendezvous: {:#}", e);
        }
    }

    fn set_state(&mut self, state: CoordinatorState) {
        if self.state == state {
            return;
        }
        debug!("Coordinator: {:?} -> {:?}", self.state, state);
        self.state = state.clone();
        self.report(CoordinatorReport::StateChanged(state));
    }

    fn report(&self, report: CoordinatorReport) {
        let _ = self.reports.send(report);
    }
}

async fn deadline_elapsed(deadline: Option<(PeerConnectionHandle, Instant)>) {
    match deadline {
        Some((_, at)) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
