use meshcall_core::{IceCandidate, ParticipantId, SessionDescription, SignalMessage, TrackId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{TransportError, TransportOp};
use crate::media::LocalTrack;
use crate::session::SessionId;
use crate::signaling::SignalingChannel;
use crate::transport::{PeerTransport, TransportEvent, TransportEvents, TransportFactory};

/// A transport or outbound-signaling step, executed in submission order.
#[derive(Debug)]
pub(crate) enum SessionOp {
    SendOffer,
    AnswerOffer(SessionDescription),
    ApplyAnswer(SessionDescription),
    AddCandidate(IceCandidate),
    SendCandidate(IceCandidate),
    AttachTrack(LocalTrack),
    DetachTrack(TrackId),
}

#[derive(Debug)]
pub(crate) enum StepOutcome {
    OfferSent,
    RemoteDescriptionApplied,
    AnswerSent,
    AnswerApplied,
    Failed(TransportError),
    DeadlineElapsed(Duration),
}

#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub participant: ParticipantId,
    pub session: SessionId,
    pub outcome: StepOutcome,
}

pub(crate) struct WorkerHandle {
    ops: mpsc::UnboundedSender<SessionOp>,
    cancel: oneshot::Sender<()>,
}

impl WorkerHandle {
    pub(crate) fn submit(&self, op: SessionOp) {
        if let Err(e) = self.ops.send(op) {
            debug!("Session worker already stopped, dropping {:?}", e.0);
        }
    }

    pub(crate) fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

/// Drives one session's transport. Sessions each get their own worker, so a
/// slow negotiation never holds up another participant.
pub(crate) struct SessionWorker {
    pub participant: ParticipantId,
    pub session: SessionId,
    pub transports: Arc<dyn TransportFactory>,
    pub signaling: Arc<dyn SignalingChannel>,
    pub transport_tx: mpsc::Sender<TransportEvent>,
    pub reports: mpsc::UnboundedSender<WorkerReport>,
}

impl SessionWorker {
    pub(crate) fn spawn(self) -> WorkerHandle {
        let (ops, ops_rx) = mpsc::unbounded_channel();
        let (cancel, cancel_rx) = oneshot::channel();
        tokio::spawn(self.run(ops_rx, cancel_rx));
        WorkerHandle { ops, cancel }
    }

    async fn run(
        self,
        mut ops: mpsc::UnboundedReceiver<SessionOp>,
        mut cancel: oneshot::Receiver<()>,
    ) {
        let events = TransportEvents::new(
            self.participant.clone(),
            self.session,
            self.transport_tx.clone(),
        );

        let transport = tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!("Session for {} cancelled before transport was created", self.participant);
                return;
            }
            created = self.transports.create(&self.participant, events) => match created {
                Ok(transport) => transport,
                Err(e) => {
                    error!("Failed to create transport for {}: {}", self.participant, e);
                    self.report(StepOutcome::Failed(e));
                    return;
                }
            }
        };

        loop {
            let op = tokio::select! {
                biased;
                _ = &mut cancel => break,
                op = ops.recv() => match op {
                    Some(op) => op,
                    None => break,
                },
            };

            let step = tokio::select! {
                biased;
                _ = &mut cancel => break,
                step = self.execute(transport.as_ref(), op) => step,
            };

            if let Err(e) = step {
                error!("Negotiation step failed for {}: {}", self.participant, e);
                self.report(StepOutcome::Failed(e));
                break;
            }
        }

        if let Err(e) = transport.close().await {
            debug!("Transport close for {} reported: {}", self.participant, e);
        }
        debug!("Session worker for {} finished", self.participant);
    }

    async fn execute(&self, transport: &dyn PeerTransport, op: SessionOp) -> Result<(), TransportError> {
        match op {
            // Reported before signaling: the reply can only arrive after the send.
            SessionOp::SendOffer => {
                let offer = transport.create_offer().await?;
                self.report(StepOutcome::OfferSent);
                self.signal(SignalMessage::Offer { description: offer }).await?;
            }
            SessionOp::AnswerOffer(offer) => {
                transport.apply_remote_description(offer).await?;
                self.report(StepOutcome::RemoteDescriptionApplied);
                let answer = transport.create_answer().await?;
                self.report(StepOutcome::AnswerSent);
                self.signal(SignalMessage::Answer { description: answer }).await?;
            }
            SessionOp::ApplyAnswer(answer) => {
                transport.apply_remote_description(answer).await?;
                self.report(StepOutcome::AnswerApplied);
            }
            SessionOp::AddCandidate(candidate) => transport.add_candidate(candidate).await?,
            SessionOp::SendCandidate(candidate) => {
                self.signal(SignalMessage::Candidate { candidate }).await?
            }
            SessionOp::AttachTrack(track) => transport.attach_track(track).await?,
            SessionOp::DetachTrack(track) => transport.detach_track(&track).await?,
        }
        Ok(())
    }

    async fn signal(&self, message: SignalMessage) -> Result<(), TransportError> {
        self.signaling
            .send(&self.participant, message)
            .await
            .map_err(|e| TransportError::operation(TransportOp::Signal, e))
    }

    fn report(&self, outcome: StepOutcome) {
        let report = WorkerReport {
            participant: self.participant.clone(),
            session: self.session,
            outcome,
        };
        if self.reports.send(report).is_err() {
            debug!("Orchestrator gone, dropping report for {}", self.participant);
        }
    }
}

/// Fails the session unless it connects within `timeout`.
pub(crate) fn spawn_deadline(
    participant: ParticipantId,
    session: SessionId,
    timeout: Duration,
    reports: mpsc::UnboundedSender<WorkerReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = reports.send(WorkerReport {
            participant,
            session,
            outcome: StepOutcome::DeadlineElapsed(timeout),
        });
    })
}
