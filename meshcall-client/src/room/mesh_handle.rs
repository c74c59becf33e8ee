use meshcall_core::{IceCandidate, ParticipantId, RoomId, SessionDescription, SignalMessage};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::MeshError;
use crate::event::{MeshEvent, PeerSnapshot};
use crate::media::LocalTrack;
use crate::room::{MeshCommand, Reply};
use crate::signaling::InboundSignal;

/// Cloneable front for a running [`MeshOrchestrator`](crate::MeshOrchestrator).
///
/// Inbound `on_*` calls only enqueue work; protocol problems they cause are
/// logged by the orchestrator and never returned here.
#[derive(Clone)]
pub struct MeshHandle {
    commands: mpsc::Sender<MeshCommand>,
    events: broadcast::Sender<MeshEvent>,
}

impl MeshHandle {
    pub(crate) fn new(commands: mpsc::Sender<MeshCommand>, events: broadcast::Sender<MeshEvent>) -> Self {
        Self { commands, events }
    }

    /// Fails with `NotConnected` until the signaling channel has an identity.
    pub async fn join_room(&self, room: impl Into<RoomId>) -> Result<(), MeshError> {
        let room = room.into();
        self.request(|reply| MeshCommand::JoinRoom { room, reply }).await
    }

    /// Joins a freshly generated room and returns its id.
    pub async fn create_room(&self) -> Result<RoomId, MeshError> {
        let room = RoomId::generate();
        self.join_room(room.clone()).await?;
        Ok(room)
    }

    /// Closes every session and leaves the room. Returns once local state is
    /// gone; transports finish closing in the background.
    pub async fn leave_room(&self) -> Result<(), MeshError> {
        self.request(|reply| MeshCommand::LeaveRoom { reply }).await
    }

    pub async fn on_peer_joined(&self, participant: impl Into<ParticipantId>) -> Result<(), MeshError> {
        self.send(MeshCommand::PeerJoined {
            participant: participant.into(),
        })
        .await
    }

    pub async fn on_peer_left(&self, participant: impl Into<ParticipantId>) -> Result<(), MeshError> {
        self.send(MeshCommand::PeerLeft {
            participant: participant.into(),
        })
        .await
    }

    pub async fn on_offer_received(
        &self,
        from: impl Into<ParticipantId>,
        offer: SessionDescription,
    ) -> Result<(), MeshError> {
        self.send(MeshCommand::OfferReceived {
            from: from.into(),
            offer,
        })
        .await
    }

    pub async fn on_answer_received(
        &self,
        from: impl Into<ParticipantId>,
        answer: SessionDescription,
    ) -> Result<(), MeshError> {
        self.send(MeshCommand::AnswerReceived {
            from: from.into(),
            answer,
        })
        .await
    }

    pub async fn on_candidate_received(
        &self,
        from: impl Into<ParticipantId>,
        candidate: IceCandidate,
    ) -> Result<(), MeshError> {
        self.send(MeshCommand::CandidateReceived {
            from: from.into(),
            candidate,
        })
        .await
    }

    /// Replaces the local track set for every live session.
    pub async fn set_local_tracks(&self, tracks: Vec<LocalTrack>) -> Result<(), MeshError> {
        self.send(MeshCommand::SetLocalTracks { tracks }).await
    }

    /// Routes one relay message to the matching `on_*` call.
    pub async fn dispatch(&self, signal: InboundSignal) -> Result<(), MeshError> {
        let InboundSignal { from, message } = signal;
        match message {
            SignalMessage::PeerJoined { participant } => self.on_peer_joined(participant).await,
            SignalMessage::PeerLeft { participant } => self.on_peer_left(participant).await,
            SignalMessage::Offer { description } => self.on_offer_received(from, description).await,
            SignalMessage::Answer { description } => self.on_answer_received(from, description).await,
            SignalMessage::Candidate { candidate } => self.on_candidate_received(from, candidate).await,
            other => {
                debug!("Ignoring {} from {}", other.op(), from);
                Ok(())
            }
        }
    }

    /// Feeds a signaling receiver into the orchestrator until either side closes.
    pub fn forward_inbound(&self, mut inbound: mpsc::Receiver<InboundSignal>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(signal) = inbound.recv().await {
                if handle.dispatch(signal).await.is_err() {
                    break;
                }
            }
            debug!("Inbound signaling forwarder stopped");
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshEvent> {
        self.events.subscribe()
    }

    /// Current sessions, ordered by participant.
    pub async fn sessions(&self) -> Result<Vec<PeerSnapshot>, MeshError> {
        self.request(|reply| MeshCommand::Snapshot { reply }).await
    }

    /// Starts a fresh offer toward a participant whose session failed or is
    /// missing. A live session is left alone.
    pub async fn renegotiate(&self, participant: impl Into<ParticipantId>) -> Result<(), MeshError> {
        let participant = participant.into();
        self.request(|reply| MeshCommand::Renegotiate { participant, reply })
            .await
    }

    /// Stops the orchestrator, leaving the room first if joined.
    pub async fn shutdown(&self) -> Result<(), MeshError> {
        self.send(MeshCommand::Shutdown).await
    }

    async fn send(&self, cmd: MeshCommand) -> Result<(), MeshError> {
        self.commands.send(cmd).await.map_err(|_| MeshError::Shutdown)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> MeshCommand) -> Result<T, MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| MeshError::Shutdown)?
    }
}
