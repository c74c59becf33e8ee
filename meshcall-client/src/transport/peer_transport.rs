use async_trait::async_trait;
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription, TrackId};
use std::sync::Arc;

use crate::error::TransportError;
use crate::media::LocalTrack;
use crate::transport::TransportEvents;

/// One point-to-point connection to a remote participant.
///
/// Implementations report asynchronous happenings (trickled candidates,
/// connectivity changes, remote tracks) through the [`TransportEvents`]
/// they were created with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Generates an offer and installs it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn apply_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Generates an answer and installs it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError>;

    async fn detach_track(&self, track: &TrackId) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        participant: &ParticipantId,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;
}
