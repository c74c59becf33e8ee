use meshcall_core::ParticipantId;
use std::collections::HashMap;

use crate::error::MeshError;
use crate::session::NegotiationSession;

/// Participant → session map for one room. Holds no lifecycle logic.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    sessions: HashMap<ParticipantId, NegotiationSession>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&NegotiationSession> {
        self.sessions.get(participant)
    }

    pub fn get_mut(&mut self, participant: &ParticipantId) -> Option<&mut NegotiationSession> {
        self.sessions.get_mut(participant)
    }

    /// Fails with `DuplicateSession` while a live session exists for the same
    /// participant. A terminal session is replaced and handed back.
    pub fn insert(
        &mut self,
        session: NegotiationSession,
    ) -> Result<Option<NegotiationSession>, MeshError> {
        let participant = session.participant().clone();
        if let Some(existing) = self.sessions.get(&participant) {
            if !existing.is_terminal() {
                return Err(MeshError::DuplicateSession(participant));
            }
        }
        Ok(self.sessions.insert(participant, session))
    }

    pub fn remove(&mut self, participant: &ParticipantId) -> Option<NegotiationSession> {
        self.sessions.remove(participant)
    }

    pub fn all_sessions(&self) -> impl Iterator<Item = &NegotiationSession> {
        self.sessions.values()
    }

    pub fn all_sessions_mut(&mut self) -> impl Iterator<Item = &mut NegotiationSession> {
        self.sessions.values_mut()
    }

    pub fn drain(&mut self) -> Vec<NegotiationSession> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
