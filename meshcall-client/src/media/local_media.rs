use std::sync::Arc;
use tokio::sync::watch;

use crate::media::LocalTrack;

/// The local track set, shared between whoever captures media and the mesh.
///
/// Every clone observes the same set; subscribers are woken on each replace.
#[derive(Clone)]
pub struct LocalMedia {
    tx: Arc<watch::Sender<Vec<LocalTrack>>>,
}

impl LocalMedia {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn with_tracks(tracks: Vec<LocalTrack>) -> Self {
        let (tx, _rx) = watch::channel(tracks);
        Self { tx: Arc::new(tx) }
    }

    pub fn current_tracks(&self) -> Vec<LocalTrack> {
        self.tx.borrow().clone()
    }

    pub fn replace(&self, tracks: Vec<LocalTrack>) {
        self.tx.send_replace(tracks);
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<LocalTrack>> {
        self.tx.subscribe()
    }
}

impl Default for LocalMedia {
    fn default() -> Self {
        Self::new()
    }
}
