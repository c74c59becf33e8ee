use meshcall_core::{IceCandidate, ParticipantId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::media::RemoteTrack;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug)]
pub enum TransportEventKind {
    /// A local candidate was gathered and must be trickled to the remote side.
    LocalCandidate(IceCandidate),
    StateChanged(TransportState),
    RemoteTrack(RemoteTrack),
}

/// Event a transport reports back to the orchestrator.
#[derive(Debug)]
pub struct TransportEvent {
    pub participant: ParticipantId,
    pub session: SessionId,
    pub kind: TransportEventKind,
}

/// Sender half handed to a transport, bound to the session that owns it.
#[derive(Clone)]
pub struct TransportEvents {
    participant: ParticipantId,
    session: SessionId,
    tx: mpsc::Sender<TransportEvent>,
}

impl TransportEvents {
    pub fn new(
        participant: ParticipantId,
        session: SessionId,
        tx: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            participant,
            session,
            tx,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub async fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(TransportEventKind::LocalCandidate(candidate)).await;
    }

    pub async fn state_changed(&self, state: TransportState) {
        self.emit(TransportEventKind::StateChanged(state)).await;
    }

    pub async fn remote_track(&self, track: RemoteTrack) {
        self.emit(TransportEventKind::RemoteTrack(track)).await;
    }

    async fn emit(&self, kind: TransportEventKind) {
        let event = TransportEvent {
            participant: self.participant.clone(),
            session: self.session,
            kind,
        };
        if self.tx.send(event).await.is_err() {
            debug!(
                "Dropping transport event for {}: orchestrator gone",
                self.participant
            );
        }
    }
}
