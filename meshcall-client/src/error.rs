use meshcall_core::{ParticipantId, TrackId};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::session::NegotiationState;

/// Errors surfaced by the mesh orchestrator and its handle.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("not joined to a room")]
    NotInRoom,

    #[error("a live negotiation session already exists for {0}")]
    DuplicateSession(ParticipantId),

    #[error("protocol mismatch for {participant}: {reason}")]
    ProtocolMismatch {
        participant: ParticipantId,
        reason: String,
    },

    #[error("transport failure for {participant}: {source}")]
    TransportFailure {
        participant: ParticipantId,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Signaling(SignalingError),

    #[error("mesh orchestrator has shut down")]
    Shutdown,
}

impl From<SignalingError> for MeshError {
    fn from(err: SignalingError) -> Self {
        match err {
            SignalingError::NotConnected => MeshError::NotConnected,
            other => MeshError::Signaling(other),
        }
    }
}

/// Which transport step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    Create,
    CreateOffer,
    ApplyRemoteDescription,
    CreateAnswer,
    AddCandidate,
    AttachTrack,
    DetachTrack,
    Signal,
    Close,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportOp::Create => "create transport",
            TransportOp::CreateOffer => "create offer",
            TransportOp::ApplyRemoteDescription => "apply remote description",
            TransportOp::CreateAnswer => "create answer",
            TransportOp::AddCandidate => "add candidate",
            TransportOp::AttachTrack => "attach track",
            TransportOp::DetachTrack => "detach track",
            TransportOp::Signal => "send signaling message",
            TransportOp::Close => "close transport",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to {op}: {reason}")]
    Operation { op: TransportOp, reason: String },

    #[error("negotiation timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed")]
    ConnectionFailed,

    #[error("track {0} has no rtp source")]
    MissingSource(TrackId),
}

impl TransportError {
    pub fn operation(op: TransportOp, reason: impl fmt::Display) -> Self {
        Self::Operation {
            op,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("failed to connect to signaling relay: {0}")]
    Connect(String),

    #[error("signaling channel closed")]
    Closed,

    #[error("malformed signaling frame: {0}")]
    Codec(String),

    #[error("signaling handshake failed: {0}")]
    Handshake(String),
}

/// An event that the negotiation state machine does not accept in its current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {action} while {state}")]
pub struct TransitionError {
    pub action: &'static str,
    pub state: NegotiationState,
}
