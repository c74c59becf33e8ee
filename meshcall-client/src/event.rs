use meshcall_core::ParticipantId;

use crate::media::RemoteTrack;
use crate::session::{NegotiationState, Role};

/// Notifications published by the orchestrator to every subscriber.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    PeerConnected {
        participant: ParticipantId,
    },
    RemoteTrackAdded {
        participant: ParticipantId,
        track: RemoteTrack,
    },
    /// Emitted once per participant, and only if a track had been surfaced.
    RemoteTrackRemoved {
        participant: ParticipantId,
    },
    PeerConnectionFailed {
        participant: ParticipantId,
        reason: String,
    },
    PeerClosed {
        participant: ParticipantId,
    },
}

impl MeshEvent {
    pub fn participant(&self) -> &ParticipantId {
        match self {
            MeshEvent::PeerConnected { participant }
            | MeshEvent::RemoteTrackAdded { participant, .. }
            | MeshEvent::RemoteTrackRemoved { participant }
            | MeshEvent::PeerConnectionFailed { participant, .. }
            | MeshEvent::PeerClosed { participant } => participant,
        }
    }
}

/// Point-in-time view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub participant: ParticipantId,
    pub role: Role,
    pub state: NegotiationState,
}
