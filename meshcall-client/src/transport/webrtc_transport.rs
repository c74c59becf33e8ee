use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{IceCandidate, ParticipantId, SdpKind, SessionDescription, TrackId};
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_remote::TrackRemote;

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportOp};
use crate::media::{LocalTrack, RemoteTrack};
use crate::transport::{PeerTransport, TransportEvents, TransportFactory, TransportState};

/// Builds webrtc-rs peer connections for every session of the mesh.
#[derive(Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        participant: &ParticipantId,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let transport = WebRtcTransport::new(participant.clone(), &self.config, events)
            .await
            .map_err(|e| TransportError::operation(TransportOp::Create, format!("{e:#}")))?;
        Ok(Arc::new(transport))
    }
}

pub struct WebRtcTransport {
    participant: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: DashMap<TrackId, Arc<RTCRtpSender>>,
}

impl WebRtcTransport {
    pub async fn new(
        participant: ParticipantId,
        config: &TransportConfig,
        events: TransportEvents,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .context("Failed to register default codecs")?;
        let registry = register_default_interceptors(Registry::new(), &mut m)
            .context("Failed to register interceptors")?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();

                Box::pin(async move {
                    info!(
                        "Peer connection state changed for {}: {:?}",
                        events.participant(),
                        s
                    );
                    events.state_changed(transport_state(s)).await;
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                events
                    .local_candidate(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    })
                    .await;
            })
        }));

        let track_events = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();

                Box::pin(async move {
                    debug!("Remote track {} from {}", track.id(), events.participant());
                    events.remote_track(RemoteTrack::from_rtp(track)).await;
                })
            },
        ));

        Ok(Self {
            participant,
            peer_connection,
            senders: DashMap::new(),
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(op_error(TransportOp::CreateOffer))?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .map_err(op_error(TransportOp::CreateOffer))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn apply_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = match description.kind {
            SdpKind::Offer => RTCSessionDescription::offer(description.sdp),
            SdpKind::Answer => RTCSessionDescription::answer(description.sdp),
        }
        .map_err(op_error(TransportOp::ApplyRemoteDescription))?;

        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(op_error(TransportOp::ApplyRemoteDescription))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(op_error(TransportOp::CreateAnswer))?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .map_err(op_error(TransportOp::CreateAnswer))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(op_error(TransportOp::AddCandidate))
    }

    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError> {
        let source = track
            .rtp_source()
            .cloned()
            .ok_or_else(|| TransportError::MissingSource(track.id().clone()))?;

        let sender = self
            .peer_connection
            .add_track(source)
            .await
            .map_err(op_error(TransportOp::AttachTrack))?;

        // RTCP has to be drained for interceptors (NACK, reports) to run.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        debug!("Attached track {} to {}", track.id(), self.participant);
        self.senders.insert(track.id().clone(), sender);
        Ok(())
    }

    async fn detach_track(&self, track: &TrackId) -> Result<(), TransportError> {
        let Some((_, sender)) = self.senders.remove(track) else {
            return Ok(());
        };
        self.peer_connection
            .remove_track(&sender)
            .await
            .map_err(op_error(TransportOp::DetachTrack))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.senders.clear();
        self.peer_connection
            .close()
            .await
            .map_err(op_error(TransportOp::Close))
    }
}

fn op_error(op: TransportOp) -> impl Fn(webrtc::Error) -> TransportError {
    move |e| TransportError::operation(op, e)
}

fn transport_state(state: RTCPeerConnectionState) -> TransportState {
    match state {
        RTCPeerConnectionState::Connecting => TransportState::Connecting,
        RTCPeerConnectionState::Connected => TransportState::Connected,
        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
        RTCPeerConnectionState::Failed => TransportState::Failed,
        RTCPeerConnectionState::Closed => TransportState::Closed,
        _ => TransportState::New,
    }
}
