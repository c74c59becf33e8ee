mod participant;
mod room;
mod sdp;
mod signaling;
mod track;

pub use participant::ParticipantId;
pub use room::RoomId;
pub use sdp::{IceCandidate, SdpKind, SessionDescription};
pub use signaling::{Envelope, IceServerConfig, SignalMessage};
pub use track::{TrackId, TrackInfo, TrackKind};
