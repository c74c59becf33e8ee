use meshcall_core::ParticipantId;
use std::fmt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::session::{Negotiation, NegotiationState, Role, SessionOp, WorkerHandle};

/// Distinguishes successive sessions for the same participant, so late
/// reports from a replaced session can be recognised and ignored.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One remote participant's negotiation: the state machine plus the worker
/// task that drives its transport.
pub struct NegotiationSession {
    id: SessionId,
    participant: ParticipantId,
    negotiation: Negotiation,
    worker: Option<WorkerHandle>,
    deadline: Option<JoinHandle<()>>,
}

impl NegotiationSession {
    pub(crate) fn new(
        id: SessionId,
        participant: ParticipantId,
        role: Role,
        worker: Option<WorkerHandle>,
    ) -> Self {
        Self {
            id,
            participant,
            negotiation: Negotiation::new(role),
            worker,
            deadline: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn role(&self) -> Role {
        self.negotiation.role()
    }

    pub fn state(&self) -> NegotiationState {
        self.negotiation.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.negotiation.is_terminal()
    }

    pub fn negotiation(&self) -> &Negotiation {
        &self.negotiation
    }

    pub(crate) fn negotiation_mut(&mut self) -> &mut Negotiation {
        &mut self.negotiation
    }

    pub(crate) fn submit(&self, op: SessionOp) {
        let Some(worker) = &self.worker else {
            return;
        };
        worker.submit(op);
    }

    pub(crate) fn set_deadline(&mut self, deadline: JoinHandle<()>) {
        self.clear_deadline();
        self.deadline = Some(deadline);
    }

    pub(crate) fn clear_deadline(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
    }

    /// Cancels in-flight transport work; the worker closes the transport on its own.
    pub(crate) fn release(&mut self) {
        self.clear_deadline();
        if let Some(worker) = self.worker.take() {
            worker.cancel();
        }
    }
}

impl Drop for NegotiationSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for NegotiationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationSession")
            .field("id", &self.id)
            .field("participant", &self.participant)
            .field("negotiation", &self.negotiation)
            .field("running", &self.worker.is_some())
            .finish()
    }
}
