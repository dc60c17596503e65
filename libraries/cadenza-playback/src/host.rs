//! Host platform integration points

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadenza_core::MediaItem;

use crate::types::{NowPlaying, PlaybackState};

/// Platform services the coordinator informs about playback
///
/// Every method defaults to a no-op so hosts implement only what they have.
pub trait HostHooks: Send {
    /// Keep the device awake while playing
    fn acquire_wake_lock(&mut self) {}

    fn release_wake_lock(&mut self) {}

    /// Ask for exclusive audio output; false if refused
    fn request_audio_focus(&mut self) -> bool {
        true
    }

    fn abandon_audio_focus(&mut self) {}

    /// Rebuild the persistent playback notification
    fn refresh_notification(&mut self, _now_playing: &NowPlaying) {}

    /// Remove the playback notification
    fn hide_notification(&mut self) {}

    /// Publish the current item to the lock screen / media session
    fn publish_metadata(&mut self, _item: &MediaItem) {}

    fn publish_state(&mut self, _state: PlaybackState) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl HostHooks for NoopHooks {}

/// Explicit online/offline check
pub trait NetworkStatus: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Connectivity flag updated by the host's connectivity listener
#[derive(Debug, Clone)]
pub struct SharedNetworkStatus(Arc<AtomicBool>);

impl SharedNetworkStatus {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Default for SharedNetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkStatus for SharedNetworkStatus {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_status_is_visible_through_clones() {
        let status = SharedNetworkStatus::default();
        let observer = status.clone();
        assert!(observer.is_online());

        status.set_online(false);
        assert!(!observer.is_online());
    }
}
