use crate::model::{IceCandidate, ParticipantId, RoomId, SessionDescription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Messages exchanged with the signaling relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum SignalMessage {
    JoinRoom { room: RoomId },
    LeaveRoom { room: RoomId },
    Welcome { participant: ParticipantId },
    PeerJoined { participant: ParticipantId },
    PeerLeft { participant: ParticipantId },
    Offer { description: SessionDescription },
    Answer { description: SessionDescription },
    Candidate { candidate: IceCandidate },
}

impl SignalMessage {
    pub fn op(&self) -> &'static str {
        match self {
            SignalMessage::JoinRoom { .. } => "join-room",
            SignalMessage::LeaveRoom { .. } => "leave-room",
            SignalMessage::Welcome { .. } => "welcome",
            SignalMessage::PeerJoined { .. } => "peer-joined",
            SignalMessage::PeerLeft { .. } => "peer-left",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
        }
    }
}

/// One text frame on the signaling socket.
///
/// `peer` is the destination on the way out and the origin on the way in;
/// room-level messages carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<ParticipantId>,
    pub signal: SignalMessage,
}

impl Envelope {
    pub fn to_peer(peer: ParticipantId, signal: SignalMessage) -> Self {
        Self {
            peer: Some(peer),
            signal,
        }
    }

    pub fn room_level(signal: SignalMessage) -> Self {
        Self { peer: None, signal }
    }
}
