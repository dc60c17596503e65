//! Subscriber notifications
//!
//! Subscribers are notified in registration order. Each subscriber call is
//! isolated: an `Err` (or a panic) is logged and delivery carries on with
//! the next subscriber. Nothing a subscriber does can reach the caller.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{EngineEvent, MediaEvent};
use crate::error::{HandlerError, PlaybackError, Result};
use crate::types::{PlaybackState, RepeatMode};

/// Events fanned out through `on_player_event`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Engine event passed through after translation
    Engine(EngineEvent),

    /// Sleep timer started, ticked, finished or was cancelled
    SleepTimerChanged,

    /// Stream stalled while offline; a recovery attempt is pending
    WaitingForNetwork,

    /// Connectivity came back and playback is being resumed
    NetworkRecovered,

    /// Recovery window elapsed; playback has been stopped
    NetworkTimedOut,
}

/// State handed to `update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: PlaybackState,
    pub index: Option<usize>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub repeat: RepeatMode,
    pub shuffling: bool,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Position handed to `update_progress`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub time: Duration,
    pub length: Option<Duration>,
    pub rate: f32,
}

/// Result of one subscriber call
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Receiver of playback notifications
///
/// Handlers run on the coordinator's thread and must not block on the
/// playback service.
pub trait PlaybackEventHandler: Send + Sync {
    /// Coarse state or current item changed
    fn update(&self, _status: &StatusSnapshot) -> HandlerResult {
        Ok(())
    }

    /// Periodic position update
    fn update_progress(&self, _progress: &Progress) -> HandlerResult {
        Ok(())
    }

    fn on_media_event(&self, _event: &MediaEvent) -> HandlerResult {
        Ok(())
    }

    fn on_player_event(&self, _event: &PlayerEvent) -> HandlerResult {
        Ok(())
    }
}

/// Handle returned by `Subscribers::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered set of registered handlers
#[derive(Default)]
pub struct Subscribers {
    handlers: Vec<(SubscriptionId, Arc<dyn PlaybackEventHandler>)>,
    next_id: u64,
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.handlers.len())
            .finish()
    }
}

fn same_handler(a: &Arc<dyn PlaybackEventHandler>, b: &Arc<dyn PlaybackEventHandler>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the end of the delivery order
    pub fn subscribe(&mut self, handler: Arc<dyn PlaybackEventHandler>) -> Result<SubscriptionId> {
        if self.handlers.iter().any(|(_, h)| same_handler(h, &handler)) {
            return Err(PlaybackError::AlreadySubscribed);
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        debug!(subscription = id.0, total = self.handlers.len(), "subscriber added");
        Ok(id)
    }

    /// Remove by subscription id; false if unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        before != self.handlers.len()
    }

    /// Remove by handler identity; false if not registered
    pub fn unsubscribe_handler(&mut self, handler: &Arc<dyn PlaybackEventHandler>) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(_, h)| !same_handler(h, handler));
        before != self.handlers.len()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn update(&self, status: &StatusSnapshot) {
        self.deliver("update", |h| h.update(status));
    }

    pub fn update_progress(&self, progress: &Progress) {
        self.deliver("update_progress", |h| h.update_progress(progress));
    }

    pub fn media_event(&self, event: &MediaEvent) {
        self.deliver("on_media_event", |h| h.on_media_event(event));
    }

    pub fn player_event(&self, event: &PlayerEvent) {
        self.deliver("on_player_event", |h| h.on_player_event(event));
    }

    fn deliver<F>(&self, channel: &'static str, call: F)
    where
        F: Fn(&dyn PlaybackEventHandler) -> HandlerResult,
    {
        for (id, handler) in &self.handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| call(handler.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(subscription = id.0, channel, error = %e, "Subscriber failed");
                }
                Err(_) => {
                    warn!(subscription = id.0, channel, "Subscriber panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl PlaybackEventHandler for Recorder {
        fn on_player_event(&self, event: &PlayerEvent) -> HandlerResult {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{:?}", self.name, event));
            if self.fail {
                Err(HandlerError::new("boom"))
            } else {
                Ok(())
            }
        }
    }

    struct Panicker;

    impl PlaybackEventHandler for Panicker {
        fn on_player_event(&self, _event: &PlayerEvent) -> HandlerResult {
            panic!("handler bug");
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<dyn PlaybackEventHandler> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn delivers_in_registration_order_despite_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut subscribers = Subscribers::new();
        subscribers.subscribe(recorder("a", &log, true)).unwrap();
        subscribers.subscribe(Arc::new(Panicker)).unwrap();
        subscribers.subscribe(recorder("b", &log, false)).unwrap();

        subscribers.player_event(&PlayerEvent::SleepTimerChanged);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:SleepTimerChanged", "b:SleepTimerChanged"]
        );
    }

    #[test]
    fn duplicate_subscription_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recorder("a", &log, false);
        let mut subscribers = Subscribers::new();

        subscribers.subscribe(Arc::clone(&handler)).unwrap();
        assert!(matches!(
            subscribers.subscribe(Arc::clone(&handler)),
            Err(PlaybackError::AlreadySubscribed)
        ));
        assert_eq!(subscribers.len(), 1);

        assert!(subscribers.unsubscribe_handler(&handler));
        assert!(!subscribers.unsubscribe_handler(&handler));
        assert!(subscribers.is_empty());
    }

    #[test]
    fn unsubscribe_by_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut subscribers = Subscribers::new();
        let a = subscribers.subscribe(recorder("a", &log, false)).unwrap();
        subscribers.subscribe(recorder("b", &log, false)).unwrap();

        assert!(subscribers.unsubscribe(a));
        assert!(!subscribers.unsubscribe(a));
        subscribers.player_event(&PlayerEvent::NetworkRecovered);
        assert_eq!(*log.lock().unwrap(), vec!["b:NetworkRecovered"]);
    }
}
