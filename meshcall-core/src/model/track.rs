use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: TrackId,
    pub kind: TrackKind,
    pub stream_id: String,
}

impl TrackInfo {
    pub fn new(id: impl Into<TrackId>, kind: TrackKind, stream_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            stream_id: stream_id.into(),
        }
    }

    pub fn audio(id: impl Into<TrackId>) -> Self {
        Self::new(id, TrackKind::Audio, "local")
    }

    pub fn video(id: impl Into<TrackId>) -> Self {
        Self::new(id, TrackKind::Video, "local")
    }
}
