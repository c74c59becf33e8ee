use meshcall_core::{IceCandidate, TrackId};
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::error::TransitionError;

/// Which side of the offer/answer exchange a session plays. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Created,
    OfferPending,
    AnswerPending,
    Connected,
    Closed,
    Failed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Closed | NegotiationState::Failed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationState::Created => write!(f, "created"),
            NegotiationState::OfferPending => write!(f, "offer-pending"),
            NegotiationState::AnswerPending => write!(f, "answer-pending"),
            NegotiationState::Connected => write!(f, "connected"),
            NegotiationState::Closed => write!(f, "closed"),
            NegotiationState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteDescription {
    Absent,
    Applying,
    Applied,
}

/// What to do with an inbound candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDisposition {
    Apply(IceCandidate),
    Queued,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTrackOutcome {
    /// First sighting of the track; `connected_now` is set when it completed the connection.
    Surfaced { connected_now: bool },
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    pub had_remote_tracks: bool,
}

/// Lifecycle of one peer connection, independent of any I/O.
///
/// Candidates that arrive before the remote description is applied are held
/// here and handed back, in arrival order, by
/// [`Negotiation::remote_description_applied`].
#[derive(Debug)]
pub struct Negotiation {
    role: Role,
    state: NegotiationState,
    remote: RemoteDescription,
    pending_candidates: VecDeque<IceCandidate>,
    attached_tracks: HashSet<TrackId>,
    surfaced_tracks: HashSet<TrackId>,
}

impl Negotiation {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: NegotiationState::Created,
            remote: RemoteDescription::Absent,
            pending_candidates: VecDeque::new(),
            attached_tracks: HashSet::new(),
            surfaced_tracks: HashSet::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote == RemoteDescription::Applied
    }

    pub fn offer_sent(&mut self) -> Result<(), TransitionError> {
        self.expect(Role::Initiator, NegotiationState::Created, "send an offer")?;
        self.state = NegotiationState::OfferPending;
        Ok(())
    }

    pub fn begin_remote_offer(&mut self) -> Result<(), TransitionError> {
        self.expect(Role::Responder, NegotiationState::Created, "accept an offer")?;
        self.begin_remote("accept an offer")
    }

    pub fn begin_remote_answer(&mut self) -> Result<(), TransitionError> {
        self.expect(Role::Initiator, NegotiationState::OfferPending, "accept an answer")?;
        self.begin_remote("accept an answer")
    }

    /// Marks the remote description as applied and returns the queued candidates to replay.
    pub fn remote_description_applied(&mut self) -> Vec<IceCandidate> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.remote = RemoteDescription::Applied;
        self.pending_candidates.drain(..).collect()
    }

    pub fn answer_sent(&mut self) -> Result<(), TransitionError> {
        self.expect(Role::Responder, NegotiationState::Created, "send an answer")?;
        self.state = NegotiationState::AnswerPending;
        Ok(())
    }

    pub fn answer_applied(&mut self) -> Result<(), TransitionError> {
        self.expect(Role::Initiator, NegotiationState::OfferPending, "apply an answer")?;
        self.state = NegotiationState::Connected;
        Ok(())
    }

    /// The transport reports an established connection. Only completes a responder.
    pub fn transport_connected(&mut self) -> bool {
        if self.state != NegotiationState::AnswerPending {
            return false;
        }
        self.state = NegotiationState::Connected;
        true
    }

    pub fn remote_track(&mut self, track: &TrackId) -> RemoteTrackOutcome {
        if self.is_terminal() || !self.surfaced_tracks.insert(track.clone()) {
            return RemoteTrackOutcome::Ignored;
        }
        let connected_now = self.state != NegotiationState::Connected;
        self.state = NegotiationState::Connected;
        RemoteTrackOutcome::Surfaced { connected_now }
    }

    pub fn receive_candidate(&mut self, candidate: IceCandidate) -> CandidateDisposition {
        if self.is_terminal() {
            return CandidateDisposition::Dropped;
        }
        if self.remote == RemoteDescription::Applied {
            return CandidateDisposition::Apply(candidate);
        }
        self.pending_candidates.push_back(candidate);
        CandidateDisposition::Queued
    }

    /// Returns false if the session had already ended.
    pub fn fail(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = NegotiationState::Failed;
        self.pending_candidates.clear();
        true
    }

    /// `None` when already closed.
    pub fn close(&mut self) -> Option<CloseOutcome> {
        if self.state == NegotiationState::Closed {
            return None;
        }
        self.state = NegotiationState::Closed;
        self.pending_candidates.clear();
        self.attached_tracks.clear();
        let had_remote_tracks = !self.surfaced_tracks.is_empty();
        self.surfaced_tracks.clear();
        Some(CloseOutcome { had_remote_tracks })
    }

    /// True when the track is new to this session and should be attached.
    pub fn attach_track(&mut self, track: &TrackId) -> bool {
        !self.is_terminal() && self.attached_tracks.insert(track.clone())
    }

    pub fn detach_track(&mut self, track: &TrackId) -> bool {
        !self.is_terminal() && self.attached_tracks.remove(track)
    }

    pub fn attached_tracks(&self) -> impl Iterator<Item = &TrackId> {
        self.attached_tracks.iter()
    }

    fn begin_remote(&mut self, action: &'static str) -> Result<(), TransitionError> {
        if self.remote != RemoteDescription::Absent {
            return Err(self.reject(action));
        }
        self.remote = RemoteDescription::Applying;
        Ok(())
    }

    fn expect(
        &self,
        role: Role,
        state: NegotiationState,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        if self.role != role || self.state != state {
            return Err(self.reject(action));
        }
        Ok(())
    }

    fn reject(&self, action: &'static str) -> TransitionError {
        TransitionError {
            action,
            state: self.state,
        }
    }
}
