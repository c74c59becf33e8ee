use meshcall_core::{TrackId, TrackInfo, TrackKind};
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

fn kind_of(codec: RTPCodecType) -> TrackKind {
    match codec {
        RTPCodecType::Video => TrackKind::Video,
        _ => TrackKind::Audio,
    }
}

/// Outbound media handle attached to every live session.
#[derive(Clone)]
pub struct LocalTrack {
    info: TrackInfo,
    source: Option<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalTrack {
    pub fn from_rtp(source: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        let info = TrackInfo::new(source.id(), kind_of(source.kind()), source.stream_id());
        Self {
            info,
            source: Some(source),
        }
    }

    /// A track with metadata only; transports that need RTP will refuse it.
    pub fn detached(info: TrackInfo) -> Self {
        Self { info, source: None }
    }

    pub fn id(&self) -> &TrackId {
        &self.info.id
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn rtp_source(&self) -> Option<&Arc<dyn TrackLocal + Send + Sync>> {
        self.source.as_ref()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("info", &self.info)
            .field("rtp", &self.source.is_some())
            .finish()
    }
}

/// Inbound media handle surfaced through `MeshEvent::RemoteTrackAdded`.
#[derive(Clone)]
pub struct RemoteTrack {
    info: TrackInfo,
    source: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn from_rtp(source: Arc<TrackRemote>) -> Self {
        let info = TrackInfo::new(source.id(), kind_of(source.kind()), source.stream_id());
        Self {
            info,
            source: Some(source),
        }
    }

    pub fn detached(info: TrackInfo) -> Self {
        Self { info, source: None }
    }

    pub fn id(&self) -> &TrackId {
        &self.info.id
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn rtp(&self) -> Option<&Arc<TrackRemote>> {
        self.source.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("info", &self.info)
            .field("rtp", &self.source.is_some())
            .finish()
    }
}
