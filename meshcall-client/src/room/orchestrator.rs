use meshcall_core::{IceCandidate, ParticipantId, RoomId, SdpKind, SessionDescription, TrackId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::MeshConfig;
use crate::error::{MeshError, TransitionError, TransportError};
use crate::event::{MeshEvent, PeerSnapshot};
use crate::media::{LocalMedia, LocalTrack};
use crate::room::{MeshCommand, MeshHandle};
use crate::session::{
    CandidateDisposition, NegotiationSession, NegotiationState, PeerRegistry, RemoteTrackOutcome,
    Role, SessionId, SessionOp, SessionWorker, StepOutcome, WorkerReport, spawn_deadline,
};
use crate::signaling::SignalingChannel;
use crate::transport::{TransportEvent, TransportEventKind, TransportFactory, TransportState};

fn publish(events: &broadcast::Sender<MeshEvent>, event: MeshEvent) {
    // No subscribers is not an error.
    let _ = events.send(event);
}

fn mismatch(participant: &ParticipantId, err: TransitionError) -> MeshError {
    MeshError::ProtocolMismatch {
        participant: participant.clone(),
        reason: err.to_string(),
    }
}

/// Single owner of a room's peer registry.
///
/// Membership changes, inbound signals, transport events and worker reports
/// are all handled on one task, one at a time. Transport I/O happens in
/// per-session workers so a slow peer never stalls the loop.
pub struct MeshOrchestrator {
    config: MeshConfig,
    signaling: Arc<dyn SignalingChannel>,
    transports: Arc<dyn TransportFactory>,
    registry: PeerRegistry,
    room: Option<RoomId>,
    local_tracks: Vec<LocalTrack>,
    command_rx: mpsc::Receiver<MeshCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    report_rx: mpsc::UnboundedReceiver<WorkerReport>,
    report_tx: mpsc::UnboundedSender<WorkerReport>,
    media_rx: watch::Receiver<Vec<LocalTrack>>,
    media_open: bool,
    events: broadcast::Sender<MeshEvent>,
}

impl MeshOrchestrator {
    /// Starts the orchestrator task and returns a handle to it.
    pub fn spawn(
        config: MeshConfig,
        signaling: Arc<dyn SignalingChannel>,
        transports: Arc<dyn TransportFactory>,
        media: LocalMedia,
    ) -> MeshHandle {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (transport_tx, transport_rx) = mpsc::channel(config.transport_event_capacity);
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);

        let orchestrator = Self {
            config,
            signaling,
            transports,
            registry: PeerRegistry::new(),
            room: None,
            local_tracks: media.current_tracks(),
            command_rx,
            transport_rx,
            transport_tx,
            report_rx,
            report_tx,
            media_rx: media.subscribe(),
            media_open: true,
            events: events.clone(),
        };
        tokio::spawn(orchestrator.run());

        MeshHandle::new(command_tx, events)
    }

    async fn run(mut self) {
        info!("Mesh event loop started");

        loop {
            tokio::select! {
                // Worker reports describe steps already taken; apply them before newer input.
                biased;

                Some(report) = self.report_rx.recv() => self.handle_report(report),

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt),

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MeshCommand::Shutdown) | None => {
                            info!("Shutdown requested. Stopping mesh.");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                    }
                }

                changed = self.media_rx.changed(), if self.media_open => {
                    match changed {
                        Ok(()) => {
                            let tracks = self.media_rx.borrow_and_update().clone();
                            self.replace_local_tracks(tracks);
                        }
                        Err(_) => {
                            debug!("Local media source dropped; keeping last track set");
                            self.media_open = false;
                        }
                    }
                }
            }
        }

        if self.room.is_some() {
            self.leave().await;
        }
        info!("Mesh event loop finished");
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::JoinRoom { room, reply } => {
                let _ = reply.send(self.join(room).await);
            }

            MeshCommand::LeaveRoom { reply } => {
                let result = match self.room {
                    Some(_) => {
                        self.leave().await;
                        Ok(())
                    }
                    None => Err(MeshError::NotInRoom),
                };
                let _ = reply.send(result);
            }

            MeshCommand::PeerJoined { participant } => {
                let result = self.on_peer_joined(&participant);
                self.log_dropped("peer-joined", &participant, result);
            }

            MeshCommand::PeerLeft { participant } => {
                self.on_peer_left(&participant);
            }

            MeshCommand::OfferReceived { from, offer } => {
                let result = self.on_offer(&from, offer);
                self.log_dropped("offer", &from, result);
            }

            MeshCommand::AnswerReceived { from, answer } => {
                let result = self.on_answer(&from, answer);
                self.log_dropped("answer", &from, result);
            }

            MeshCommand::CandidateReceived { from, candidate } => {
                let result = self.on_candidate(&from, candidate);
                self.log_dropped("candidate", &from, result);
            }

            MeshCommand::SetLocalTracks { tracks } => self.replace_local_tracks(tracks),

            MeshCommand::Renegotiate { participant, reply } => {
                let _ = reply.send(self.renegotiate(&participant));
            }

            MeshCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }

            MeshCommand::Shutdown => {}
        }
    }

    fn log_dropped(&self, what: &str, from: &ParticipantId, result: Result<(), MeshError>) {
        let Err(e) = result else {
            return;
        };
        warn!("Dropped {} from {}: {}", what, from, e);
    }

    async fn join(&mut self, room: RoomId) -> Result<(), MeshError> {
        if self.signaling.local_participant().is_none() {
            return Err(MeshError::NotConnected);
        }
        if self.room.as_ref() == Some(&room) {
            debug!("Already in room {}", room);
            return Ok(());
        }
        if self.room.is_some() {
            self.leave().await;
        }

        self.signaling.join_room(&room).await?;
        info!("Joined room {}", room);
        self.room = Some(room);
        Ok(())
    }

    /// Tears down every session locally, then tells the relay. Transport
    /// close is left to the cancelled workers.
    async fn leave(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };

        for session in self.registry.drain() {
            self.close_session(session);
        }

        if let Err(e) = self.signaling.leave_room(&room).await {
            warn!("Failed to notify relay about leaving {}: {}", room, e);
        }
        info!("Left room {}", room);
    }

    fn joined(&self, what: &str, from: &ParticipantId) -> bool {
        if self.room.is_none() {
            debug!("Ignoring {} from {}: not in a room", what, from);
            return false;
        }
        true
    }

    fn on_peer_joined(&mut self, participant: &ParticipantId) -> Result<(), MeshError> {
        if !self.joined("peer-joined", participant) {
            return Ok(());
        }
        if self.signaling.local_participant().as_ref() == Some(participant) {
            return Ok(());
        }
        if let Some(existing) = self.registry.get(participant) {
            if !existing.is_terminal() {
                info!(
                    "Session for {} already {}, ignoring duplicate join",
                    participant,
                    existing.state()
                );
                return Ok(());
            }
        }

        info!("Peer {} joined, sending offer", participant);
        let session = self.open_session(participant, Role::Initiator);
        session.submit(SessionOp::SendOffer);
        self.admit(session)
    }

    fn on_offer(&mut self, from: &ParticipantId, offer: SessionDescription) -> Result<(), MeshError> {
        if !self.joined("offer", from) {
            return Ok(());
        }
        if offer.kind != SdpKind::Offer {
            return Err(MeshError::ProtocolMismatch {
                participant: from.clone(),
                reason: format!("expected an offer, got {:?}", offer.kind),
            });
        }

        if let Some(existing) = self.registry.get(from).filter(|s| !s.is_terminal()) {
            let glare = existing.role() == Role::Initiator
                && matches!(
                    existing.state(),
                    NegotiationState::Created | NegotiationState::OfferPending
                );
            if !glare {
                return Err(MeshError::ProtocolMismatch {
                    participant: from.clone(),
                    reason: format!(
                        "offer for {:?} session in state {}",
                        existing.role(),
                        existing.state()
                    ),
                });
            }

            // Both sides apply the same rule: the lower identity keeps its offer.
            match self.signaling.local_participant() {
                Some(local) if local < *from => {
                    info!("Glare with {}: keeping our offer", from);
                    return Ok(());
                }
                _ => {
                    info!("Glare with {}: yielding to their offer", from);
                    if let Some(mut retired) = self.registry.remove(from) {
                        retired.release();
                    }
                }
            }
        }

        info!("Offer from {}, answering", from);
        let mut session = self.open_session(from, Role::Responder);
        session
            .negotiation_mut()
            .begin_remote_offer()
            .map_err(|e| mismatch(from, e))?;
        session.submit(SessionOp::AnswerOffer(offer));
        self.admit(session)
    }

    fn on_answer(&mut self, from: &ParticipantId, answer: SessionDescription) -> Result<(), MeshError> {
        if !self.joined("answer", from) {
            return Ok(());
        }
        if answer.kind != SdpKind::Answer {
            return Err(MeshError::ProtocolMismatch {
                participant: from.clone(),
                reason: format!("expected an answer, got {:?}", answer.kind),
            });
        }
        let Some(session) = self.registry.get_mut(from) else {
            return Err(MeshError::ProtocolMismatch {
                participant: from.clone(),
                reason: "no session".to_owned(),
            });
        };

        session
            .negotiation_mut()
            .begin_remote_answer()
            .map_err(|e| mismatch(from, e))?;
        debug!("Applying answer from {}", from);
        session.submit(SessionOp::ApplyAnswer(answer));
        Ok(())
    }

    fn on_candidate(&mut self, from: &ParticipantId, candidate: IceCandidate) -> Result<(), MeshError> {
        if !self.joined("candidate", from) {
            return Ok(());
        }
        let Some(session) = self.registry.get_mut(from) else {
            return Err(MeshError::ProtocolMismatch {
                participant: from.clone(),
                reason: "no session".to_owned(),
            });
        };

        match session.negotiation_mut().receive_candidate(candidate) {
            CandidateDisposition::Apply(candidate) => session.submit(SessionOp::AddCandidate(candidate)),
            CandidateDisposition::Queued => {
                debug!(
                    "Queued candidate from {} ({} pending)",
                    from,
                    session.negotiation().pending_candidates()
                );
            }
            CandidateDisposition::Dropped => {
                debug!("Dropped candidate from {}: session {}", from, session.state());
            }
        }
        Ok(())
    }

    fn on_peer_left(&mut self, participant: &ParticipantId) {
        if !self.joined("peer-left", participant) {
            return;
        }
        let Some(session) = self.registry.remove(participant) else {
            debug!("Peer {} left without a session", participant);
            return;
        };
        info!("Peer {} left", participant);
        self.close_session(session);
    }

    fn renegotiate(&mut self, participant: &ParticipantId) -> Result<(), MeshError> {
        if self.room.is_none() {
            return Err(MeshError::NotInRoom);
        }
        if let Some(existing) = self.registry.get(participant) {
            if !existing.is_terminal() {
                debug!(
                    "Not renegotiating with {}: session is {}",
                    participant,
                    existing.state()
                );
                return Ok(());
            }
        }

        if let Some(retired) = self.registry.remove(participant) {
            self.close_session(retired);
        }
        info!("Renegotiating with {}", participant);
        let session = self.open_session(participant, Role::Initiator);
        session.submit(SessionOp::SendOffer);
        self.admit(session)
    }

    fn snapshot(&self) -> Vec<PeerSnapshot> {
        let mut peers: Vec<PeerSnapshot> = self
            .registry
            .all_sessions()
            .map(|s| PeerSnapshot {
                participant: s.participant().clone(),
                role: s.role(),
                state: s.state(),
            })
            .collect();
        peers.sort_by(|a, b| a.participant.cmp(&b.participant));
        peers
    }

    /// Creates a session with its worker running and the current local
    /// tracks queued for attachment.
    fn open_session(&self, participant: &ParticipantId, role: Role) -> NegotiationSession {
        let id = SessionId::new();
        let worker = SessionWorker {
            participant: participant.clone(),
            session: id,
            transports: self.transports.clone(),
            signaling: self.signaling.clone(),
            transport_tx: self.transport_tx.clone(),
            reports: self.report_tx.clone(),
        }
        .spawn();

        let mut session = NegotiationSession::new(id, participant.clone(), role, Some(worker));
        for track in &self.local_tracks {
            if session.negotiation_mut().attach_track(track.id()) {
                session.submit(SessionOp::AttachTrack(track.clone()));
            }
        }

        if let Some(timeout) = self.config.negotiation_timeout {
            session.set_deadline(spawn_deadline(
                participant.clone(),
                id,
                timeout,
                self.report_tx.clone(),
            ));
        }
        session
    }

    fn admit(&mut self, session: NegotiationSession) -> Result<(), MeshError> {
        if let Some(replaced) = self.registry.insert(session)? {
            self.close_session(replaced);
        }
        Ok(())
    }

    fn close_session(&self, mut session: NegotiationSession) {
        session.release();
        let participant = session.participant().clone();
        let Some(outcome) = session.negotiation_mut().close() else {
            return;
        };
        if outcome.had_remote_tracks {
            publish(
                &self.events,
                MeshEvent::RemoteTrackRemoved {
                    participant: participant.clone(),
                },
            );
        }
        publish(&self.events, MeshEvent::PeerClosed { participant });
    }

    fn fail_session(&mut self, participant: &ParticipantId, error: TransportError) {
        let Some(session) = self.registry.get_mut(participant) else {
            return;
        };
        if !session.negotiation_mut().fail() {
            return;
        }
        session.release();

        let err = MeshError::TransportFailure {
            participant: participant.clone(),
            source: error,
        };
        error!("Session failed: {}", err);
        publish(
            &self.events,
            MeshEvent::PeerConnectionFailed {
                participant: participant.clone(),
                reason: err.to_string(),
            },
        );
    }

    fn replace_local_tracks(&mut self, tracks: Vec<LocalTrack>) {
        debug!("Local track set now has {} tracks", tracks.len());
        self.local_tracks = tracks;

        let wanted: HashSet<&TrackId> = self.local_tracks.iter().map(LocalTrack::id).collect();
        for session in self.registry.all_sessions_mut() {
            if session.is_terminal() {
                continue;
            }

            let stale: Vec<TrackId> = session
                .negotiation()
                .attached_tracks()
                .filter(|id| !wanted.contains(id))
                .cloned()
                .collect();
            for id in stale {
                if session.negotiation_mut().detach_track(&id) {
                    session.submit(SessionOp::DetachTrack(id));
                }
            }

            for track in &self.local_tracks {
                if session.negotiation_mut().attach_track(track.id()) {
                    session.submit(SessionOp::AttachTrack(track.clone()));
                }
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        let TransportEvent {
            participant,
            session: id,
            kind,
        } = event;
        let Some(session) = self
            .registry
            .get_mut(&participant)
            .filter(|s| s.id() == id && !s.is_terminal())
        else {
            debug!("Ignoring transport event from stale session of {}", participant);
            return;
        };

        match kind {
            TransportEventKind::LocalCandidate(candidate) => {
                session.submit(SessionOp::SendCandidate(candidate));
            }

            TransportEventKind::StateChanged(TransportState::Connected) => {
                if session.negotiation_mut().transport_connected() {
                    session.clear_deadline();
                    info!("Peer {} connected", participant);
                    publish(&self.events, MeshEvent::PeerConnected { participant });
                }
            }

            TransportEventKind::StateChanged(TransportState::Failed) => {
                self.fail_session(&participant, TransportError::ConnectionFailed);
            }

            TransportEventKind::StateChanged(state) => {
                debug!("Transport for {} is now {:?}", participant, state);
            }

            TransportEventKind::RemoteTrack(track) => {
                match session.negotiation_mut().remote_track(track.id()) {
                    RemoteTrackOutcome::Surfaced { connected_now } => {
                        if connected_now {
                            session.clear_deadline();
                            info!("Peer {} connected", participant);
                            publish(
                                &self.events,
                                MeshEvent::PeerConnected {
                                    participant: participant.clone(),
                                },
                            );
                        }
                        info!("Remote track {} from {}", track.id(), participant);
                        publish(
                            &self.events,
                            MeshEvent::RemoteTrackAdded { participant, track },
                        );
                    }
                    RemoteTrackOutcome::Ignored => {
                        debug!("Remote track {} from {} already surfaced", track.id(), participant);
                    }
                }
            }
        }
    }

    fn handle_report(&mut self, report: WorkerReport) {
        let WorkerReport {
            participant,
            session: id,
            outcome,
        } = report;
        let Some(session) = self
            .registry
            .get_mut(&participant)
            .filter(|s| s.id() == id && !s.is_terminal())
        else {
            debug!("Ignoring {:?} from stale session of {}", outcome, participant);
            return;
        };

        let step = match outcome {
            StepOutcome::OfferSent => session.negotiation_mut().offer_sent(),

            StepOutcome::RemoteDescriptionApplied => {
                for candidate in session.negotiation_mut().remote_description_applied() {
                    session.submit(SessionOp::AddCandidate(candidate));
                }
                Ok(())
            }

            StepOutcome::AnswerSent => session.negotiation_mut().answer_sent(),

            StepOutcome::AnswerApplied => {
                for candidate in session.negotiation_mut().remote_description_applied() {
                    session.submit(SessionOp::AddCandidate(candidate));
                }
                let applied = session.negotiation_mut().answer_applied();
                if applied.is_ok() {
                    session.clear_deadline();
                    info!("Peer {} connected", participant);
                    publish(
                        &self.events,
                        MeshEvent::PeerConnected {
                            participant: participant.clone(),
                        },
                    );
                }
                applied
            }

            StepOutcome::Failed(e) => {
                self.fail_session(&participant, e);
                Ok(())
            }

            StepOutcome::DeadlineElapsed(timeout) => {
                if session.state() != NegotiationState::Connected {
                    self.fail_session(&participant, TransportError::Timeout(timeout));
                }
                Ok(())
            }
        };

        if let Err(e) = step {
            debug!("Ignoring worker step for {}: {}", participant, e);
        }
    }
}
