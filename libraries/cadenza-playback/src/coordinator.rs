//! Playback coordinator - core orchestration
//!
//! Owns the engine, the playlist and its navigation state, the subscribers
//! and every timer. All methods take `&mut self`; callers on other threads
//! go through `PlaybackService`, which serializes them onto one thread.
//!
//! Engine events are translated into an `Outcome` first and dispatched
//! second, so the ordering of "tell subscribers" against "act" is fixed per
//! outcome rather than spread through the event handler.

use std::sync::Arc;
use std::time::Duration;

use cadenza_core::{
    validate_location, ListChange, MediaItem, MediaKind, MetaField, Playlist,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::engine::{EngineEvent, MediaEngine, MediaEvent};
use crate::error::Result;
use crate::events::{
    PlaybackEventHandler, PlayerEvent, Progress, StatusSnapshot, SubscriptionId, Subscribers,
};
use crate::fade::{FadeOut, FadePacer, ManualPacer};
use crate::host::{HostHooks, NetworkStatus, NoopHooks, SharedNetworkStatus};
use crate::navigation::{NavigationState, Removal};
use crate::remote::{AudioRoute, FocusChange, RemoteAction};
use crate::sleep_timer::{SleepStep, SleepTimer};
use crate::store::{MemoryStore, SavedSession, SessionStore};
use crate::timers::{TimerKind, TimerQueue};
use crate::types::{NowPlaying, PlaybackState, RepeatMode, SeekInterval};
use crate::watchdog::NetworkWatchdog;

/// `previous()` restarts the current item once playback is this far in
const RESTART_THRESHOLD: Duration = Duration::from_millis(5000);

/// Normal engine volume
const FULL_VOLUME: u8 = 100;

/// Decision taken for one engine event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Forward the event to subscribers
    Notify,

    /// Forward the event, then advance to the next item
    Advance,

    /// Pause, then forward the event
    Pause,

    /// Stop playback, then forward the event
    Stop,

    /// Swallow the event and wait for connectivity
    SuppressAndWatch,
}

/// Transient audio focus bookkeeping
#[derive(Debug, Default, Clone, Copy)]
struct FocusMemory {
    held: bool,
    loss_transient: bool,
    ducked: bool,
    was_playing: bool,
}

pub struct PlaybackCoordinator {
    config: ServiceConfig,
    engine: Box<dyn MediaEngine>,
    hooks: Box<dyn HostHooks>,
    network: Arc<dyn NetworkStatus>,
    store: Box<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    pacer: Box<dyn FadePacer>,

    playlist: Playlist,
    nav: NavigationState,
    list_identifier: Option<String>,
    subscribers: Subscribers,
    timers: TimerQueue,

    // Per-item flags, reset optimistically by `play_index`
    parsed: bool,
    pausable: bool,
    seekable: bool,

    /// Offset applied once by the next `play_index`
    saved_time: Duration,

    /// Index used by `play()` when nothing is current
    resume_index: Option<usize>,

    /// Set by `stop_playback`, cleared by `load`/`play_index`
    stopped: bool,

    sleep_timer: Option<SleepTimer>,
    next_sleep_timer_id: u64,
    fade: Option<FadeOut>,
    next_fade_id: u64,
    watchdog: NetworkWatchdog,

    focus: FocusMemory,
    wake_lock_held: bool,
    headset_was_playing: bool,
    seek_interval: SeekInterval,
    detect_headset: bool,
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("len", &self.playlist.len())
            .field("current", &self.nav.current())
            .field("subscribers", &self.subscribers.len())
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl PlaybackCoordinator {
    /// Create a coordinator driving `engine`
    ///
    /// Collaborators default to no-op hooks, an always-online network, an
    /// in-memory session store, the system clock and a manual fade pacer.
    pub fn new(engine: impl MediaEngine + 'static, config: ServiceConfig) -> Result<Self> {
        config.validate()?;

        let mut playlist = Playlist::new();
        playlist.set_observed(true);

        Ok(Self {
            seek_interval: config.seek_interval_secs,
            detect_headset: config.detect_headset,
            watchdog: NetworkWatchdog::new(config.network_recovery_window()),
            config,
            engine: Box::new(engine),
            hooks: Box::new(NoopHooks),
            network: Arc::new(SharedNetworkStatus::default()),
            store: Box::new(MemoryStore::new()),
            clock: Arc::new(SystemClock::new()),
            pacer: Box::new(ManualPacer::new()),
            playlist,
            nav: NavigationState::new(),
            list_identifier: None,
            subscribers: Subscribers::new(),
            timers: TimerQueue::new(),
            parsed: false,
            pausable: true,
            seekable: true,
            saved_time: Duration::ZERO,
            resume_index: None,
            stopped: false,
            sleep_timer: None,
            next_sleep_timer_id: 1,
            fade: None,
            next_fade_id: 1,
            focus: FocusMemory::default(),
            wake_lock_held: false,
            headset_was_playing: false,
        })
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl HostHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: Arc<dyn NetworkStatus>) -> Self {
        self.network = network;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_fade_pacer(mut self, pacer: impl FadePacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    /// Make shuffle order reproducible
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.nav = NavigationState::with_seed(seed);
        self
    }

    pub(crate) fn set_fade_pacer(&mut self, pacer: Box<dyn FadePacer>) {
        self.pacer = pacer;
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ===== Subscribers =====

    /// Register a handler; the first one starts progress updates if playing
    pub fn subscribe(&mut self, handler: Arc<dyn PlaybackEventHandler>) -> Result<SubscriptionId> {
        let id = self.subscribers.subscribe(handler)?;
        if self.subscribers.len() == 1 && self.has_media() && self.engine.is_playing() {
            self.start_progress();
        }
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.unsubscribe(id);
        self.stop_progress_if_unobserved();
        removed
    }

    pub fn unsubscribe_handler(&mut self, handler: &Arc<dyn PlaybackEventHandler>) -> bool {
        let removed = self.subscribers.unsubscribe_handler(handler);
        self.stop_progress_if_unobserved();
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn stop_progress_if_unobserved(&mut self) {
        if self.subscribers.is_empty() {
            self.timers.cancel(TimerKind::Progress);
        }
    }

    // ===== Loading =====

    /// Replace the playlist without starting playback
    pub fn load(&mut self, items: Vec<MediaItem>, identifier: Option<String>) {
        debug!(len = items.len(), "loading media list");

        if self.has_media() {
            self.persist_session();
        }
        self.release_current();

        self.playlist = Playlist::from_items(items);
        self.playlist.set_observed(true);
        self.nav.reset();
        self.list_identifier = None;
        self.resume_index = None;
        self.saved_time = Duration::ZERO;
        self.stopped = false;

        if self.playlist.is_empty() {
            warn!("Empty media list, nothing to play");
            self.nav.recompute(0, None);
            self.notify_update();
            return;
        }

        self.list_identifier = identifier;
        self.nav.recompute(self.playlist.len(), None);
        self.persist_session();
        self.notify_update();
    }

    /// Load locations, skipping any that do not validate
    pub fn load_locations<I, S>(&mut self, locations: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = locations
            .into_iter()
            .filter_map(|location| match validate_location(location.as_ref()) {
                Ok(mrl) => Some(MediaItem::new(mrl)),
                Err(e) => {
                    warn!(location = location.as_ref(), error = %e, "Invalid media location");
                    None
                }
            })
            .collect();
        self.load(items, None);
    }

    /// Restore the last saved session of `kind`
    ///
    /// Returns false when nothing was saved. The stored index and offset are
    /// consumed: they apply to the next `play()` and are reset in the store.
    pub fn load_last_playlist(&mut self, kind: MediaKind) -> Result<bool> {
        let Some(session) = self.store.load(kind)? else {
            return Ok(false);
        };
        if session.locations.is_empty() {
            return Ok(false);
        }

        self.nav.restore_modes(session.repeat, session.shuffling);
        self.load_locations(&session.locations);
        self.resume_index = session.index;
        self.saved_time = Duration::from_millis(session.time_ms);

        let reset = SavedSession {
            index: None,
            time_ms: 0,
            ..session
        };
        self.store.save(kind, &reset)?;
        info!(?kind, len = self.playlist.len(), "restored last playlist");
        Ok(true)
    }

    /// Add items at the end; with nothing current this is a `load`
    pub fn append(&mut self, items: Vec<MediaItem>) {
        if !self.has_media() {
            self.load(items, None);
            return;
        }
        for item in items {
            self.playlist.add(item);
        }
        self.on_list_changed();
    }

    pub fn insert(&mut self, index: usize, item: MediaItem) -> Result<()> {
        self.playlist.insert(index, item)?;
        self.on_list_changed();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<MediaItem> {
        let item = self.playlist.remove(index)?;
        self.on_list_changed();
        Ok(item)
    }

    /// Remove every item at `location`, returning how many were removed
    pub fn remove_location(&mut self, location: &str) -> Result<usize> {
        let removed = self.playlist.remove_location(location)?;
        self.on_list_changed();
        Ok(removed)
    }

    /// Move the item at `from` to the insertion point `to` (0..=len)
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        self.playlist.move_item(from, to)?;
        self.on_list_changed();
        Ok(())
    }

    fn on_list_changed(&mut self) {
        self.apply_list_changes(false);
        self.persist_session();
        self.notify_update();
    }

    /// Repair navigation for every recorded list mutation
    fn apply_list_changes(&mut self, expanding: bool) {
        let len = self.playlist.len();
        let mut current_removed = false;

        for change in self.playlist.drain_changes() {
            match change {
                ListChange::Added { index, .. } => self.nav.on_inserted(index, len, expanding),
                ListChange::Removed { index, .. } => {
                    if self.nav.on_removed(index, len, expanding) == Removal::CurrentRemoved {
                        current_removed = true;
                    }
                }
                ListChange::Moved { from, to, .. } => self.nav.on_moved(from, to, len),
                ListChange::Cleared { .. } => self.nav.on_cleared(),
            }
        }

        if current_removed {
            debug!("current item removed");
            if self.nav.next().is_some() {
                self.next();
            } else if let Some(current) = self.nav.current() {
                self.play_index(current);
            } else {
                self.stop_playback();
            }
        }
    }

    /// Replace the current item by the engine's sub-items, if it has any
    ///
    /// Returns the index of the first sub-item.
    fn expand(&mut self) -> Option<usize> {
        let current = self.nav.current()?;
        let sub_items = self.engine.take_sub_items();
        if sub_items.is_empty() {
            return None;
        }

        debug!(index = current, count = sub_items.len(), "expanding current item");
        if let Err(e) = self.playlist.remove(current) {
            warn!(error = %e, "Failed to expand current item");
            return None;
        }
        for item in sub_items.into_iter().rev() {
            if let Err(e) = self.playlist.insert(current, item) {
                warn!(error = %e, "Failed to insert sub-item");
            }
        }
        self.apply_list_changes(true);
        self.persist_session();
        Some(current)
    }

    // ===== Transport =====

    /// Start playing the item at `index`
    ///
    /// An out-of-range index falls back to 0; an empty list is a no-op.
    pub fn play_index(&mut self, index: usize) {
        let len = self.playlist.len();
        if len == 0 {
            warn!("Empty media list, nothing to play");
            return;
        }
        let index = if index < len {
            index
        } else {
            warn!(index, len, "Index out of bounds, playing first item");
            0
        };

        self.cancel_fade();
        if let Some(armed) = self.watchdog.disarm() {
            debug!(id = armed.id, "watchdog disarmed by new selection");
            self.timers.cancel(TimerKind::NetworkTimeout(armed.id));
        }
        let Some(item) = self.playlist.get_mut(index) else {
            return;
        };
        item.reset_transient();
        let location = item.location.clone();

        self.parsed = false;
        self.pausable = true;
        self.seekable = true;
        self.stopped = false;
        self.resume_index = None;
        self.nav.set_current(Some(index), len);

        info!(index, %location, "playing");
        self.engine.set_source(&location);
        self.request_focus();
        self.engine.play();
        if !self.saved_time.is_zero() {
            self.engine.set_time(self.saved_time);
        }
        self.saved_time = Duration::ZERO;

        self.on_media_changed();
        self.schedule_stall_check();
    }

    /// Advance to the computed next item, stopping when there is none
    pub fn next(&mut self) {
        let len = self.playlist.len();
        match self.nav.advance(len) {
            Some(index) => self.play_index(index),
            None => {
                warn!("Invalid next index, stopping");
                self.stop_playback();
            }
        }
    }

    /// Go to the previous item early in playback, else restart this one
    pub fn previous(&mut self) {
        let early = !self.engine.is_seekable() || self.engine.time() < RESTART_THRESHOLD;
        let len = self.playlist.len();

        if early && self.nav.previous().is_some() {
            match self.nav.retreat(len) {
                Some(index) => self.play_index(index),
                None => {
                    warn!("Invalid previous index, stopping");
                    self.stop_playback();
                }
            }
        } else if let Some(current) = self.nav.current() {
            self.set_position(0.0);
            self.play_index(current);
        }
    }

    /// Resume, or start from the resume index when nothing is current
    pub fn play(&mut self) {
        if self.watchdog.is_armed() {
            self.recover_from_stall();
        } else if !self.has_media() && !self.playlist.is_empty() {
            self.play_index(self.resume_index.unwrap_or(0));
        } else if self.has_media() {
            self.engine.play();
            self.start_progress();
            self.publish_current();
        }
        self.resume_sleep_timer();
    }

    /// Pause if the current item allows it
    pub fn pause(&mut self) {
        if !self.pausable {
            debug!("pause ignored, media not pausable");
            return;
        }
        self.cancel_fade();
        self.persist_session();
        self.timers.cancel(TimerKind::Progress);
        self.timers.cancel(TimerKind::StallCheck);
        self.engine.pause();
        self.publish_current();
        self.pause_sleep_timer();
    }

    /// Stop playback; subscribers stay registered and are told about it
    pub fn stop_playback(&mut self) {
        self.persist_session();
        self.release_current();

        self.nav.reset();
        self.nav.recompute(self.playlist.len(), None);
        self.stopped = true;

        self.hooks.hide_notification();
        self.hooks.publish_state(PlaybackState::Stopped);
        self.notify_update();
        self.notify_progress();
        self.abandon_focus();
        self.cancel_sleep_timer();
    }

    /// Stop playback and drop every subscriber
    pub fn stop_service(&mut self) {
        self.subscribers.clear();
        self.stop_playback();
    }

    /// Halt the engine and drop everything tied to the current item
    fn release_current(&mut self) {
        self.cancel_fade();
        self.engine.stop();
        self.engine.release_media();
        if let Some(armed) = self.watchdog.disarm() {
            self.timers.cancel(TimerKind::NetworkTimeout(armed.id));
        }
        self.timers.cancel(TimerKind::Progress);
        self.timers.cancel(TimerKind::StallCheck);
        self.release_wake_lock();
        self.pause_sleep_timer();
    }

    pub fn shuffle(&mut self) {
        self.nav.toggle_shuffle(self.playlist.len());
        self.persist_session();
        self.notify_update();
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.nav.set_repeat(repeat, self.playlist.len());
        self.persist_session();
        self.notify_update();
    }

    /// Seek if seekable and not already there
    pub fn set_time(&mut self, time: Duration) {
        if self.seekable && self.engine.time() != time {
            self.engine.set_time(time);
        }
    }

    pub fn set_position(&mut self, position: f32) {
        if self.seekable {
            self.engine.set_position(position);
        }
    }

    /// Change playback speed; progress moves at a new pace so clients hear
    pub fn set_rate(&mut self, rate: f32) {
        self.engine.set_rate(rate);
        self.notify_progress();
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.engine.set_volume(volume.min(FULL_VOLUME));
    }

    pub fn set_seek_interval(&mut self, seconds: u32) -> Result<()> {
        self.seek_interval = SeekInterval::try_from(seconds)?;
        Ok(())
    }

    pub fn set_detect_headset(&mut self, enable: bool) {
        self.detect_headset = enable;
    }

    pub fn set_sleep_fade_duration(&mut self, duration: Duration) {
        self.config.sleep_fade_duration_ms = duration.as_millis() as u64;
    }

    pub fn set_media_list_identifier(&mut self, identifier: Option<String>) {
        self.list_identifier = identifier;
    }

    /// Explicit identifier, else a hash of the ordered locations
    pub fn media_list_identifier(&self) -> Option<String> {
        if self.playlist.is_empty() {
            return None;
        }
        self.list_identifier
            .clone()
            .or_else(|| self.playlist.identifier())
    }

    // ===== Remote control =====

    pub fn handle_remote(&mut self, action: RemoteAction) {
        debug!(?action, "remote action");
        match action {
            RemoteAction::PlayPause => {
                if self.playlist.is_empty() {
                    self.restore_for_remote();
                } else if self.has_media() {
                    if self.engine.is_playing() {
                        self.pause();
                    } else {
                        self.play();
                    }
                }
            }
            RemoteAction::Play => {
                if self.playlist.is_empty() {
                    self.restore_for_remote();
                } else if self.has_media() && !self.engine.is_playing() {
                    self.play();
                }
            }
            RemoteAction::Pause => {
                if self.has_media() {
                    self.pause();
                }
            }
            RemoteAction::Stop => self.stop_service(),
            RemoteAction::Backward => {
                let target = self
                    .engine
                    .time()
                    .saturating_sub(self.seek_interval.as_duration());
                self.set_time(target);
            }
            RemoteAction::Forward => {
                let target = self.engine.time() + self.seek_interval.as_duration();
                let target = self.engine.length().map_or(target, |len| target.min(len));
                self.set_time(target);
            }
        }
    }

    /// Media buttons with nothing loaded resume the last audio session
    fn restore_for_remote(&mut self) {
        match self.load_last_playlist(MediaKind::Audio) {
            Ok(true) => self.play(),
            Ok(false) => debug!("no saved audio session to resume"),
            Err(e) => warn!(error = %e, "Failed to restore last playlist"),
        }
    }

    pub fn handle_audio_route(&mut self, route: AudioRoute) {
        if !self.detect_headset {
            return;
        }
        match route {
            AudioRoute::BecomingNoisy => {
                debug!("headset removed");
                self.headset_was_playing = self.engine.is_playing();
                if self.headset_was_playing && self.has_media() {
                    self.pause();
                }
            }
            AudioRoute::HeadsetPlugged => {
                debug!("headset inserted");
                if self.headset_was_playing && self.has_media() {
                    self.play();
                }
            }
        }
    }

    pub fn handle_focus_change(&mut self, change: FocusChange) {
        debug!(?change, "audio focus change");
        match change {
            FocusChange::Loss => {
                self.abandon_focus();
                self.pause();
            }
            FocusChange::LossTransient => {
                self.focus.loss_transient = true;
                self.focus.was_playing = self.engine.is_playing();
                if self.focus.was_playing {
                    self.pause();
                }
            }
            FocusChange::LossTransientCanDuck => {
                if self.engine.is_playing() {
                    self.engine.set_volume(self.config.duck_volume);
                    self.focus.ducked = true;
                }
            }
            FocusChange::Gain => {
                if self.focus.ducked {
                    self.engine.set_volume(FULL_VOLUME);
                    self.focus.ducked = false;
                } else if self.focus.loss_transient {
                    if self.focus.was_playing {
                        self.play();
                    }
                    self.focus.loss_transient = false;
                }
            }
        }
    }

    fn request_focus(&mut self) {
        if !self.focus.held && self.hooks.request_audio_focus() {
            self.focus.held = true;
        }
    }

    fn abandon_focus(&mut self) {
        if self.focus.held {
            self.hooks.abandon_audio_focus();
            self.focus.held = false;
        }
    }

    fn acquire_wake_lock(&mut self) {
        if !self.wake_lock_held {
            self.hooks.acquire_wake_lock();
            self.wake_lock_held = true;
        }
    }

    fn release_wake_lock(&mut self) {
        if self.wake_lock_held {
            self.hooks.release_wake_lock();
            self.wake_lock_held = false;
        }
    }

    // ===== Engine events =====

    /// Decide what an engine event means and act on it
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        let outcome = self.translate(event);
        debug!(?event, ?outcome, "engine event");

        let notification = PlayerEvent::Engine(event);
        match outcome {
            Outcome::Notify => self.subscribers.player_event(&notification),
            Outcome::Advance => {
                // next() may stop playback; subscribers hear EndReached first
                self.subscribers.player_event(&notification);
                self.next();
            }
            Outcome::Pause => {
                self.pause();
                self.subscribers.player_event(&notification);
            }
            Outcome::Stop => {
                self.stop_playback();
                self.subscribers.player_event(&notification);
            }
            Outcome::SuppressAndWatch => self.arm_watchdog(),
        }
    }

    /// Update local state for `event` and choose its outcome
    fn translate(&mut self, event: EngineEvent) -> Outcome {
        match event {
            EngineEvent::Playing => {
                if let Some(armed) = self.watchdog.disarm() {
                    info!("stream resumed on its own");
                    self.timers.cancel(TimerKind::NetworkTimeout(armed.id));
                    self.subscribers.player_event(&PlayerEvent::NetworkRecovered);
                }
                self.notify_update();
                self.hooks.publish_state(PlaybackState::Playing);
                self.notify_progress();
                self.start_progress();
                self.request_focus();
                self.acquire_wake_lock();
                self.refresh_notification();
                self.persist_session();
                self.schedule_stall_check();
                Outcome::Notify
            }
            EngineEvent::Paused => {
                self.notify_update();
                self.hooks.publish_state(PlaybackState::Paused);
                self.notify_progress();
                self.refresh_notification();
                self.release_wake_lock();
                self.timers.cancel(TimerKind::StallCheck);
                Outcome::Notify
            }
            EngineEvent::Stopped => {
                self.notify_update();
                self.hooks.publish_state(PlaybackState::Stopped);
                self.notify_progress();
                self.release_wake_lock();
                self.abandon_focus();
                self.timers.cancel(TimerKind::StallCheck);
                Outcome::Notify
            }
            EngineEvent::EndReached => {
                if self.watchdog.is_armed() || self.is_stream_stall_at_end() {
                    return Outcome::SuppressAndWatch;
                }
                self.notify_progress();
                let expanded = self.expand();
                self.nav.recompute(self.playlist.len(), expanded);
                self.release_wake_lock();
                self.abandon_focus();
                Outcome::Advance
            }
            EngineEvent::EncounteredError => {
                if self.watchdog.is_armed() || self.is_offline_stream() {
                    return Outcome::SuppressAndWatch;
                }
                warn!(location = ?self.current_location(), "Engine reported an error");
                self.notify_update();
                self.notify_progress();
                self.release_wake_lock();
                if self.pausable {
                    Outcome::Pause
                } else {
                    Outcome::Stop
                }
            }
            EngineEvent::TimeChanged(_) => {
                self.schedule_stall_check();
                Outcome::Notify
            }
            EngineEvent::SeekableChanged(seekable) => {
                self.seekable = seekable;
                Outcome::Notify
            }
            EngineEvent::PausableChanged(pausable) => {
                self.pausable = pausable;
                Outcome::Notify
            }
            EngineEvent::ElementaryStreamAdded => {
                self.publish_current();
                Outcome::Notify
            }
            EngineEvent::Opening
            | EngineEvent::PositionChanged(_)
            | EngineEvent::ElementaryStreamDeleted
            | EngineEvent::Vout(_) => Outcome::Notify,
        }
    }

    fn current_is_remote(&self) -> bool {
        self.current_item().is_some_and(|item| !item.is_local())
    }

    fn is_offline_stream(&self) -> bool {
        self.current_is_remote() && !self.network.is_online()
    }

    /// End of a stream with real time left while offline is a stall
    fn is_stream_stall_at_end(&self) -> bool {
        if !self.is_offline_stream() {
            return false;
        }
        match self.engine.length() {
            Some(length) => length.saturating_sub(self.engine.time()) > self.config.stream_end_slack(),
            None => true,
        }
    }

    // ===== Media events =====

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let forward = match event {
            MediaEvent::MetaChanged(field) => {
                if self.parsed && self.refresh_current_meta(Some(field)) {
                    self.notify_update();
                }
                true
            }
            MediaEvent::ParsedChanged => {
                self.refresh_current_meta(None);
                self.parsed = true;
                if let Some(item) = self.current_item_mut() {
                    item.parsed = true;
                }
                true
            }
            MediaEvent::SubItemAdded | MediaEvent::DurationChanged => false,
        };

        if forward {
            self.subscribers.media_event(&event);
            if self.parsed {
                self.refresh_notification();
            }
        }
    }

    /// Pull engine metadata into the current item; true if the UI should update
    fn refresh_current_meta(&mut self, field: Option<MetaField>) -> bool {
        if field == Some(MetaField::Publisher) {
            return false;
        }
        let meta = self.engine.current_meta();
        let Some(item) = self.current_item_mut() else {
            return false;
        };
        if let Some(meta) = meta {
            item.apply_meta(&meta);
        }
        field != Some(MetaField::NowPlaying) || item.now_playing.is_some()
    }

    // ===== Timers =====

    /// Earliest pending timer deadline on the coordinator's clock
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Time left until the next timer is due
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(self.clock.now()))
    }

    /// Run every timer that is due
    pub fn fire_due_timers(&mut self) {
        let now = self.clock.now();
        for kind in self.timers.pop_due(now) {
            self.fire_timer(kind, now);
        }
    }

    pub fn is_timer_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.is_scheduled(kind)
    }

    fn fire_timer(&mut self, kind: TimerKind, now: Duration) {
        match kind {
            TimerKind::Progress => {
                if !self.subscribers.is_empty()
                    && self.engine.is_playing()
                    && !self.watchdog.is_armed()
                {
                    self.notify_progress();
                    self.timers
                        .schedule(TimerKind::Progress, now + self.config.progress_interval());
                }
            }
            TimerKind::SleepTimer(id) => {
                let Some(timer) = self.sleep_timer.as_mut() else {
                    return;
                };
                if timer.id() != id {
                    return;
                }
                let step = timer.fire(now);
                self.apply_sleep_step(id, step, now);
            }
            TimerKind::NetworkTimeout(id) => {
                if self.watchdog.expire(id) {
                    warn!(id, "Network did not recover in time, stopping");
                    self.subscribers.player_event(&PlayerEvent::NetworkTimedOut);
                    self.stop_playback();
                }
            }
            TimerKind::StallCheck => {
                if !self.current_is_remote() || !self.engine.is_playing() {
                    return;
                }
                if self.network.is_online() {
                    self.schedule_stall_check();
                } else {
                    warn!("No playback progress while offline");
                    self.arm_watchdog();
                }
            }
        }
    }

    fn start_progress(&mut self) {
        if !self.subscribers.is_empty() {
            self.timers.schedule(TimerKind::Progress, self.clock.now());
        }
    }

    fn schedule_stall_check(&mut self) {
        if self.current_is_remote() && !self.watchdog.is_armed() {
            self.timers
                .schedule(TimerKind::StallCheck, self.clock.now() + self.config.stall_grace());
        }
    }

    // ===== Network recovery =====

    fn arm_watchdog(&mut self) {
        let now = self.clock.now();
        let saved_time = self.engine.time();
        let Some((armed, deadline)) = self.watchdog.arm(now, saved_time) else {
            debug!("watchdog already armed");
            return;
        };

        warn!(id = armed.id, ?saved_time, "Stream stalled while offline, waiting for network");
        self.persist_session();
        self.abandon_focus();
        self.release_wake_lock();
        self.timers.cancel(TimerKind::Progress);
        self.timers.cancel(TimerKind::StallCheck);
        self.timers.schedule(TimerKind::NetworkTimeout(armed.id), deadline);

        self.hooks.publish_state(PlaybackState::WaitingForNetwork);
        self.subscribers.player_event(&PlayerEvent::WaitingForNetwork);
        self.notify_update();
    }

    /// Connectivity changed; coming back online recovers a stalled stream
    pub fn connectivity_changed(&mut self, online: bool) {
        debug!(online, "connectivity changed");
        if online && self.watchdog.is_armed() {
            self.recover_from_stall();
        }
    }

    fn recover_from_stall(&mut self) {
        let Some(armed) = self.watchdog.disarm() else {
            return;
        };
        self.timers.cancel(TimerKind::NetworkTimeout(armed.id));
        info!(id = armed.id, saved_time = ?armed.saved_time, "recovering stalled stream");

        self.subscribers.player_event(&PlayerEvent::NetworkRecovered);
        match self.nav.current() {
            Some(index) => {
                self.saved_time = armed.saved_time;
                self.play_index(index);
            }
            None => self.stop_playback(),
        }
    }

    pub fn is_waiting_for_network(&self) -> bool {
        self.watchdog.is_armed()
    }

    // ===== Sleep timer =====

    /// Replace any running sleep timer with one of `duration`
    pub fn set_sleep_timer(&mut self, duration: Duration) {
        self.cancel_sleep_timer();

        let id = self.next_sleep_timer_id;
        self.next_sleep_timer_id += 1;
        let mut timer = SleepTimer::new(id, duration, self.config.sleep_timer_tick());
        let now = self.clock.now();
        let step = timer.start(true, now);
        self.sleep_timer = Some(timer);
        info!(id, ?duration, "sleep timer set");

        self.apply_sleep_step(id, step, now);
        self.subscribers.player_event(&PlayerEvent::SleepTimerChanged);
        if self.engine.is_playing() {
            self.resume_sleep_timer();
        }
    }

    /// Cancel the live sleep timer; redundant calls do nothing
    pub fn cancel_sleep_timer(&mut self) {
        let Some(timer) = self.sleep_timer.as_mut() else {
            return;
        };
        if timer.cancel() {
            debug!(id = timer.id(), "sleep timer cancelled");
            self.timers.cancel(TimerKind::SleepTimer(timer.id()));
            self.subscribers.player_event(&PlayerEvent::SleepTimerChanged);
        }
    }

    pub fn pause_sleep_timer(&mut self) {
        let now = self.clock.now();
        if let Some(timer) = self.sleep_timer.as_mut() {
            if !timer.is_finished_or_cancelled() && !timer.is_paused() {
                timer.pause(now);
                self.timers.cancel(TimerKind::SleepTimer(timer.id()));
            }
        }
    }

    pub fn resume_sleep_timer(&mut self) {
        let now = self.clock.now();
        let Some(timer) = self.sleep_timer.as_mut() else {
            return;
        };
        if timer.is_paused() {
            let id = timer.id();
            let (_, step) = timer.resume(now);
            self.apply_sleep_step(id, step, now);
        }
    }

    /// Time left on the live sleep timer, zero if none
    pub fn sleep_timer_remaining(&self) -> Duration {
        self.sleep_timer
            .as_ref()
            .filter(|timer| !timer.is_finished_or_cancelled())
            .map_or(Duration::ZERO, |timer| timer.remaining(self.clock.now()))
    }

    fn apply_sleep_step(&mut self, id: u64, step: SleepStep, tick_start: Duration) {
        match step {
            SleepStep::Tick { remaining } => {
                debug!(id, ?remaining, "sleep timer tick");
                self.subscribers.player_event(&PlayerEvent::SleepTimerChanged);
                let now = self.clock.now();
                if let Some(next) = self
                    .sleep_timer
                    .as_ref()
                    .and_then(|timer| timer.next_tick(tick_start, now))
                {
                    self.timers.schedule(TimerKind::SleepTimer(id), next);
                }
            }
            SleepStep::Wait { next } => self.timers.schedule(TimerKind::SleepTimer(id), next),
            SleepStep::Finished => self.on_sleep_timer_finished(id),
            SleepStep::Idle => {}
        }
    }

    fn on_sleep_timer_finished(&mut self, id: u64) {
        info!(id, "sleep timer reached, fading out");
        if self.engine.is_playing() {
            self.start_fade();
        }
        self.subscribers.player_event(&PlayerEvent::SleepTimerChanged);
    }

    // ===== Fade-out =====

    fn start_fade(&mut self) {
        self.cancel_fade();

        let id = self.next_fade_id;
        self.next_fade_id += 1;
        let fade = FadeOut::new(
            id,
            self.engine.volume(),
            self.config.fade_step(),
            self.config.sleep_fade_duration(),
        );
        self.pacer
            .start(id, self.config.fade_step(), fade.cancel_flag());
        self.fade = Some(fade);
        self.fade_step(id);
    }

    /// Apply one step of fade `id`; stale or cancelled fades are ignored
    pub fn fade_step(&mut self, id: u64) {
        let Some(fade) = self.fade.as_ref() else {
            return;
        };
        if fade.id() != id || fade.is_cancelled() {
            return;
        }

        let volume = self.engine.volume();
        if volume > 0 {
            let lowered = fade.next_volume(volume);
            debug!(id, volume = lowered, "fade step");
            self.engine.set_volume(lowered);
            return;
        }

        if let Some(fade) = self.fade.take() {
            fade.cancel();
            self.pause();
            self.engine.set_volume(fade.restore_volume());
            debug!(id, "fade complete");
        }
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Stop a running fade and put the volume back
    fn cancel_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            fade.cancel();
            self.engine.set_volume(fade.restore_volume());
            debug!(id = fade.id(), "fade cancelled");
        }
    }

    // ===== Notifications =====

    fn notify_update(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers.update(&snapshot);
        self.publish_current();
    }

    fn notify_progress(&self) {
        self.subscribers.update_progress(&self.progress());
    }

    fn publish_current(&mut self) {
        if let Some(item) = self.nav.current().and_then(|i| self.playlist.get(i)) {
            self.hooks.publish_metadata(item);
        }
    }

    fn refresh_notification(&mut self) {
        if let Some(now_playing) = self.now_playing() {
            self.hooks.refresh_notification(&now_playing);
        }
    }

    fn on_media_changed(&mut self) {
        self.start_progress();
        self.publish_current();
        self.persist_session();
        self.notify_update();
    }

    // ===== Persistence =====

    fn media_kind(&self) -> MediaKind {
        if self.playlist.iter().any(|item| item.kind == MediaKind::Video) {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    /// Save list, position and modes; failures are logged only
    fn persist_session(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        let time = if self.has_media() {
            self.engine.time()
        } else {
            Duration::ZERO
        };
        let session = SavedSession {
            locations: self.playlist.locations(),
            index: self.nav.current(),
            time_ms: time.as_millis() as u64,
            shuffling: self.nav.is_shuffling(),
            repeat: self.nav.repeat(),
        };
        let kind = self.media_kind();
        if let Err(e) = self.store.save(kind, &session) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    // ===== Accessors =====

    fn current_item(&self) -> Option<&MediaItem> {
        self.nav.current().and_then(|i| self.playlist.get(i))
    }

    fn current_item_mut(&mut self) -> Option<&mut MediaItem> {
        let index = self.nav.current()?;
        self.playlist.get_mut(index)
    }

    pub fn current_media(&self) -> Option<&MediaItem> {
        self.current_item()
    }

    pub fn has_media(&self) -> bool {
        self.current_item().is_some()
    }

    pub fn state(&self) -> PlaybackState {
        if self.watchdog.is_armed() {
            PlaybackState::WaitingForNetwork
        } else if !self.has_media() {
            if self.stopped {
                PlaybackState::Stopped
            } else {
                PlaybackState::Idle
            }
        } else if self.engine.is_playing() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state(),
            index: self.nav.current(),
            title: self.title(),
            artist: self.artist(),
            repeat: self.nav.repeat(),
            shuffling: self.nav.is_shuffling(),
            has_next: self.has_next(),
            has_previous: self.has_previous(),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            time: self.engine.time(),
            length: self.engine.length(),
            rate: self.engine.rate(),
        }
    }

    /// Display data for the host notification
    pub fn now_playing(&self) -> Option<NowPlaying> {
        let item = self.current_item()?;
        Some(NowPlaying {
            title: self.title().unwrap_or_else(|| item.display_title()),
            subtitle: item.display_subtitle(),
            artwork_url: item.artwork_url.clone(),
            playing: self.engine.is_playing(),
            seek_interval: self.seek_interval,
        })
    }

    /// Current title; stream now-playing text takes precedence
    pub fn title(&self) -> Option<String> {
        let item = self.current_item()?;
        Some(
            item.now_playing
                .clone()
                .unwrap_or_else(|| item.display_title()),
        )
    }

    /// Current artist; for streams with now-playing text, the station title
    pub fn artist(&self) -> Option<String> {
        let item = self.current_item()?;
        Some(if item.now_playing.is_some() {
            item.display_title()
        } else {
            item.display_artist().to_string()
        })
    }

    pub fn album(&self) -> Option<String> {
        self.current_item()
            .map(|item| item.display_album().to_string())
    }

    pub fn title_prev(&self) -> Option<String> {
        self.nav
            .previous()
            .and_then(|i| self.playlist.get(i))
            .map(|item| item.display_title())
    }

    pub fn title_next(&self) -> Option<String> {
        self.nav
            .next()
            .and_then(|i| self.playlist.get(i))
            .map(|item| item.display_title())
    }

    pub fn artist_prev(&self) -> Option<String> {
        self.nav
            .previous()
            .and_then(|i| self.playlist.get(i))
            .map(|item| item.display_artist().to_string())
    }

    pub fn artist_next(&self) -> Option<String> {
        self.nav
            .next()
            .and_then(|i| self.playlist.get(i))
            .map(|item| item.display_artist().to_string())
    }

    pub fn has_next(&self) -> bool {
        self.nav.next().is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.nav.previous().is_some()
    }

    pub fn can_shuffle(&self) -> bool {
        self.playlist.len() > 2
    }

    pub fn has_playlist(&self) -> bool {
        self.playlist.len() > 1
    }

    pub fn is_shuffling(&self) -> bool {
        self.nav.is_shuffling()
    }

    pub fn repeat(&self) -> RepeatMode {
        self.nav.repeat()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.nav.current()
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.nav.previous()
    }

    pub fn next_index(&self) -> Option<usize> {
        self.nav.next()
    }

    pub fn shuffle_history(&self) -> &[usize] {
        self.nav.history()
    }

    pub fn current_location(&self) -> Option<&str> {
        self.current_item().map(|item| item.location.as_str())
    }

    pub fn media_locations(&self) -> Vec<String> {
        self.playlist.locations()
    }

    pub fn media(&self) -> Vec<MediaItem> {
        self.playlist.iter().cloned().collect()
    }

    pub fn playlist_len(&self) -> usize {
        self.playlist.len()
    }

    pub fn time(&self) -> Duration {
        self.engine.time()
    }

    pub fn length(&self) -> Option<Duration> {
        self.engine.length()
    }

    pub fn rate(&self) -> f32 {
        self.engine.rate()
    }

    pub fn volume(&self) -> u8 {
        self.engine.volume()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub fn is_pausable(&self) -> bool {
        self.pausable
    }

    pub fn seek_interval(&self) -> SeekInterval {
        self.seek_interval
    }

    pub fn has_audio_focus(&self) -> bool {
        self.focus.held
    }
}
