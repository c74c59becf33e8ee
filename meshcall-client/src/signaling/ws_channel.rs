use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use meshcall_core::{Envelope, ParticipantId, RoomId, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use crate::error::SignalingError;
use crate::signaling::{InboundSignal, SignalingChannel};

#[derive(Debug, Clone)]
pub struct WsSignalingConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub inbound_capacity: usize,
}

impl WsSignalingConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            inbound_capacity: 256,
        }
    }
}

/// JSON-over-WebSocket signaling: one [`Envelope`] per text frame.
pub struct WsSignalingChannel {
    local: ParticipantId,
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Message>,
    tasks: Vec<AbortHandle>,
}

impl WsSignalingChannel {
    /// Connects and waits for the relay to assign our identity.
    pub async fn connect(
        config: WsSignalingConfig,
    ) -> Result<(Self, mpsc::Receiver<InboundSignal>), SignalingError> {
        info!("Connecting to signaling relay: {}", config.url);

        let (ws_stream, _) = tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str()))
            .await
            .map_err(|_| SignalingError::Connect("timed out".to_owned()))?
            .map_err(|e| SignalingError::Connect(e.to_string()))?;

        let (mut sink, mut stream) = ws_stream.split();

        let local = tokio::time::timeout(config.connect_timeout, wait_for_welcome(&mut stream))
            .await
            .map_err(|_| SignalingError::Handshake("no welcome from relay".to_owned()))??;

        info!("Connected to signaling relay with ID: {}", local);

        let connected = Arc::new(AtomicBool::new(true));
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);

        let send_task = tokio::spawn({
            let connected = connected.clone();
            async move {
                while let Some(msg) = outbound_rx.recv().await {
                    if let Err(e) = sink.send(msg).await {
                        error!("Signaling socket write failed: {}", e);
                        break;
                    }
                }
                connected.store(false, Ordering::Release);
                let _ = sink.close().await;
            }
        });

        let recv_task = tokio::spawn({
            let connected = connected.clone();
            async move {
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            let Some(signal) = decode_inbound(&text) else {
                                continue;
                            };
                            if inbound_tx.send(signal).await.is_err() {
                                debug!("Inbound signal receiver dropped");
                                break;
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Signaling socket read failed: {}", e);
                            break;
                        }
                    }
                }
                connected.store(false, Ordering::Release);
                info!("Signaling relay disconnected");
            }
        });

        let channel = Self {
            local,
            connected,
            outbound,
            tasks: vec![send_task.abort_handle(), recv_task.abort_handle()],
        };
        Ok((channel, inbound_rx))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::Release);
        for task in &self.tasks {
            task.abort();
        }
    }

    fn push(&self, envelope: Envelope) -> Result<(), SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }
        let json =
            serde_json::to_string(&envelope).map_err(|e| SignalingError::Codec(e.to_string()))?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| SignalingError::Closed)
    }
}

impl Drop for WsSignalingChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    fn local_participant(&self) -> Option<ParticipantId> {
        self.is_connected().then(|| self.local.clone())
    }

    async fn join_room(&self, room: &RoomId) -> Result<(), SignalingError> {
        self.push(Envelope::room_level(SignalMessage::JoinRoom { room: room.clone() }))
    }

    async fn leave_room(&self, room: &RoomId) -> Result<(), SignalingError> {
        self.push(Envelope::room_level(SignalMessage::LeaveRoom { room: room.clone() }))
    }

    async fn send(&self, to: &ParticipantId, message: SignalMessage) -> Result<(), SignalingError> {
        debug!("Sending {} to {}", message.op(), to);
        self.push(Envelope::to_peer(to.clone(), message))
    }
}

async fn wait_for_welcome<S>(stream: &mut S) -> Result<ParticipantId, SignalingError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| SignalingError::Handshake(e.to_string()))?;
        let Message::Text(text) = frame else {
            continue;
        };
        match serde_json::from_str::<Envelope>(&text) {
            Ok(Envelope {
                signal: SignalMessage::Welcome { participant },
                ..
            }) => return Ok(participant),
            Ok(other) => debug!("Ignoring {} before welcome", other.signal.op()),
            Err(e) => warn!("Invalid frame during handshake: {}", e),
        }
    }
    Err(SignalingError::Closed)
}

fn decode_inbound(text: &str) -> Option<InboundSignal> {
    let envelope = match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Invalid signaling frame: {}", e);
            return None;
        }
    };
    let op = envelope.signal.op();
    let signal = InboundSignal::from_envelope(envelope);
    if signal.is_none() {
        debug!("Ignoring room-level {} frame", op);
    }
    signal
}
