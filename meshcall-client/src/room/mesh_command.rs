use meshcall_core::{IceCandidate, ParticipantId, RoomId, SessionDescription};
use tokio::sync::oneshot;

use crate::error::MeshError;
use crate::event::PeerSnapshot;
use crate::media::LocalTrack;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, MeshError>>;

/// Work items for the orchestrator task, processed strictly in receipt order.
#[derive(Debug)]
pub(crate) enum MeshCommand {
    JoinRoom {
        room: RoomId,
        reply: Reply<()>,
    },
    LeaveRoom {
        reply: Reply<()>,
    },

    /// Relay says a participant entered the room; we initiate toward it.
    PeerJoined {
        participant: ParticipantId,
    },
    PeerLeft {
        participant: ParticipantId,
    },
    OfferReceived {
        from: ParticipantId,
        offer: SessionDescription,
    },
    AnswerReceived {
        from: ParticipantId,
        answer: SessionDescription,
    },
    CandidateReceived {
        from: ParticipantId,
        candidate: IceCandidate,
    },

    SetLocalTracks {
        tracks: Vec<LocalTrack>,
    },
    Renegotiate {
        participant: ParticipantId,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<Vec<PeerSnapshot>>,
    },
    Shutdown,
}
