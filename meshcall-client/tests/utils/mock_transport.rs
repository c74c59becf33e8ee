use async_trait::async_trait;
use meshcall_client::{
    LocalTrack, PeerTransport, RemoteTrack, TransportError, TransportEvents, TransportFactory,
    TransportOp, TransportState,
};
use meshcall_core::{IceCandidate, ParticipantId, SdpKind, SessionDescription, TrackId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// A call a mock transport received, in the order it received them.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Create,
    CreateOffer,
    ApplyRemoteDescription(SdpKind),
    CreateAnswer,
    AddCandidate(String),
    AttachTrack(TrackId),
    DetachTrack(TrackId),
    Close,
}

#[derive(Default)]
struct FactoryState {
    calls: Mutex<Vec<(ParticipantId, TransportCall)>>,
    events: Mutex<HashMap<ParticipantId, TransportEvents>>,
    failures: Mutex<HashMap<ParticipantId, TransportOp>>,
    gates: Mutex<HashMap<TransportOp, Arc<Semaphore>>>,
}

impl FactoryState {
    fn record(&self, participant: &ParticipantId, call: TransportCall) {
        self.calls.lock().unwrap().push((participant.clone(), call));
    }

    /// Waits at a held gate, then fails if the step is scripted to fail.
    async fn step(&self, participant: &ParticipantId, op: TransportOp) -> Result<(), TransportError> {
        let gate = self.gates.lock().unwrap().get(&op).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        let fails = self.failures.lock().unwrap().get(participant) == Some(&op);
        if fails {
            return Err(TransportError::operation(op, "scripted failure"));
        }
        Ok(())
    }
}

/// Mock TransportFactory whose transports record calls and can be scripted
/// to fail a step or hold it until released.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    state: Arc<FactoryState>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `op` fail for every transport created for `participant`.
    pub fn fail(&self, participant: &str, op: TransportOp) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(ParticipantId::from(participant), op);
    }

    pub fn clear_failures(&self) {
        self.state.failures.lock().unwrap().clear();
    }

    /// Blocks every transport at `op` until [`release`](Self::release).
    pub fn hold(&self, op: TransportOp) {
        self.state
            .gates
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: TransportOp) {
        if let Some(gate) = self.state.gates.lock().unwrap().remove(&op) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self, participant: &str) -> Vec<TransportCall> {
        let participant = ParticipantId::from(participant);
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == participant)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn count(&self, participant: &str, call: &TransportCall) -> usize {
        self.calls(participant).iter().filter(|c| *c == call).count()
    }

    pub fn added_candidates(&self, participant: &str) -> Vec<String> {
        self.calls(participant)
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn transports_created(&self) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| *call == TransportCall::Create)
            .count()
    }

    /// Event sender of the newest transport created for `participant`.
    fn events(&self, participant: &str) -> TransportEvents {
        self.state
            .events
            .lock()
            .unwrap()
            .get(&ParticipantId::from(participant))
            .cloned()
            .expect("no transport created for participant")
    }

    pub async fn emit_state(&self, participant: &str, state: TransportState) {
        self.events(participant).state_changed(state).await;
    }

    pub async fn emit_track(&self, participant: &str, track: RemoteTrack) {
        self.events(participant).remote_track(track).await;
    }

    pub async fn emit_candidate(&self, participant: &str, candidate: IceCandidate) {
        self.events(participant).local_candidate(candidate).await;
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        participant: &ParticipantId,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        self.state.record(participant, TransportCall::Create);
        self.state.step(participant, TransportOp::Create).await?;
        self.state
            .events
            .lock()
            .unwrap()
            .insert(participant.clone(), events);

        Ok(Arc::new(MockTransport {
            participant: participant.clone(),
            state: self.state.clone(),
        }))
    }
}

struct MockTransport {
    participant: ParticipantId,
    state: Arc<FactoryState>,
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        self.state.step(&self.participant, TransportOp::CreateOffer).await?;
        self.state.record(&self.participant, TransportCall::CreateOffer);
        Ok(SessionDescription::offer(format!("v=0 offer to {}", self.participant)))
    }

    async fn apply_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        self.state
            .step(&self.participant, TransportOp::ApplyRemoteDescription)
            .await?;
        self.state.record(
            &self.participant,
            TransportCall::ApplyRemoteDescription(description.kind),
        );
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.state.step(&self.participant, TransportOp::CreateAnswer).await?;
        self.state.record(&self.participant, TransportCall::CreateAnswer);
        Ok(SessionDescription::answer(format!("v=0 answer to {}", self.participant)))
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.state.step(&self.participant, TransportOp::AddCandidate).await?;
        self.state
            .record(&self.participant, TransportCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError> {
        self.state.step(&self.participant, TransportOp::AttachTrack).await?;
        self.state
            .record(&self.participant, TransportCall::AttachTrack(track.id().clone()));
        Ok(())
    }

    async fn detach_track(&self, track: &TrackId) -> Result<(), TransportError> {
        self.state.step(&self.participant, TransportOp::DetachTrack).await?;
        self.state
            .record(&self.participant, TransportCall::DetachTrack(track.clone()));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.record(&self.participant, TransportCall::Close);
        Ok(())
    }
}
