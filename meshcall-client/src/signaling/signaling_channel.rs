use async_trait::async_trait;
use meshcall_core::{Envelope, ParticipantId, RoomId, SignalMessage};

use crate::error::SignalingError;

/// Relay-backed message transport the mesh negotiates over.
///
/// Delivery is reliable and ordered per destination; nothing is assumed
/// about ordering across different participants.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Identity assigned by the relay, or `None` while not connected.
    fn local_participant(&self) -> Option<ParticipantId>;

    async fn join_room(&self, room: &RoomId) -> Result<(), SignalingError>;

    async fn leave_room(&self, room: &RoomId) -> Result<(), SignalingError>;

    async fn send(&self, to: &ParticipantId, message: SignalMessage) -> Result<(), SignalingError>;
}

/// A message delivered by the relay, tagged with the participant it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSignal {
    pub from: ParticipantId,
    pub message: SignalMessage,
}

impl InboundSignal {
    pub fn new(from: impl Into<ParticipantId>, message: SignalMessage) -> Self {
        Self {
            from: from.into(),
            message,
        }
    }

    /// Membership notices name their subject in the payload rather than the envelope.
    pub fn from_envelope(envelope: Envelope) -> Option<Self> {
        let from = match (&envelope.peer, &envelope.signal) {
            (Some(peer), _) => peer.clone(),
            (None, SignalMessage::PeerJoined { participant })
            | (None, SignalMessage::PeerLeft { participant }) => participant.clone(),
            (None, _) => return None,
        };
        Some(Self {
            from,
            message: envelope.signal,
        })
    }
}
