//! Shared test doubles for coordinator tests
//!
//! Everything here is cheap to clone; clones share state so a test can keep
//! a handle while the coordinator owns the boxed copy.

#![allow(dead_code)]

use cadenza_playback::{
    Clock, EngineEvent, HandlerResult, HostHooks, ManualClock, MediaEngine, MediaEvent,
    MediaItem, MediaMeta, MemoryStore, NowPlaying, PlaybackCoordinator, PlaybackEventHandler,
    PlaybackState, PlayerEvent, Progress, ServiceConfig, SharedNetworkStatus, StatusSnapshot,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

// ===== Engine =====

#[derive(Debug)]
pub struct EngineState {
    pub source: Option<String>,
    /// Every location handed to `set_source`, in order
    pub sources: Vec<String>,
    pub playing: bool,
    pub time: Duration,
    pub length: Option<Duration>,
    pub position: f32,
    pub rate: f32,
    pub volume: u8,
    pub seekable: bool,
    pub pausable: bool,
    pub sub_items: Vec<MediaItem>,
    pub meta: Option<MediaMeta>,
    pub stop_calls: usize,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            source: None,
            sources: Vec::new(),
            playing: false,
            time: Duration::ZERO,
            length: None,
            position: 0.0,
            rate: 1.0,
            volume: 100,
            seekable: true,
            pausable: true,
            sub_items: Vec::new(),
            meta: None,
            stop_calls: 0,
        }
    }
}

/// Engine that plays instantly and never produces sound
#[derive(Debug, Clone, Default)]
pub struct MockEngine(Arc<Mutex<EngineState>>);

impl MockEngine {
    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.0.lock().unwrap()
    }

    /// Pretend playback has reached `time`
    pub fn reach(&self, time: Duration) {
        self.state().time = time;
    }

    pub fn set_length(&self, length: Option<Duration>) {
        self.state().length = length;
    }

    pub fn last_source(&self) -> Option<String> {
        self.state().sources.last().cloned()
    }
}

impl MediaEngine for MockEngine {
    fn set_source(&mut self, location: &str) {
        let mut state = self.state();
        state.source = Some(location.to_string());
        state.sources.push(location.to_string());
        state.playing = false;
        state.time = Duration::ZERO;
    }

    fn release_media(&mut self) {
        self.state().source = None;
    }

    fn play(&mut self) {
        let mut state = self.state();
        state.playing = state.source.is_some();
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state();
        state.playing = false;
        state.time = Duration::ZERO;
        state.stop_calls += 1;
    }

    fn set_time(&mut self, time: Duration) {
        self.state().time = time;
    }

    fn time(&self) -> Duration {
        self.state().time
    }

    fn length(&self) -> Option<Duration> {
        self.state().length
    }

    fn set_position(&mut self, position: f32) {
        let mut state = self.state();
        state.position = position;
        if let Some(length) = state.length {
            state.time = length.mul_f32(position);
        }
    }

    fn position(&self) -> f32 {
        self.state().position
    }

    fn set_rate(&mut self, rate: f32) {
        self.state().rate = rate;
    }

    fn rate(&self) -> f32 {
        self.state().rate
    }

    fn set_volume(&mut self, volume: u8) {
        self.state().volume = volume;
    }

    fn volume(&self) -> u8 {
        self.state().volume
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn is_seekable(&self) -> bool {
        self.state().seekable
    }

    fn is_pausable(&self) -> bool {
        self.state().pausable
    }

    fn take_sub_items(&mut self) -> Vec<MediaItem> {
        std::mem::take(&mut self.state().sub_items)
    }

    fn current_meta(&self) -> Option<MediaMeta> {
        self.state().meta.clone()
    }
}

// ===== Subscriber =====

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Update(StatusSnapshot),
    Progress(Progress),
    Media(MediaEvent),
    Player(PlayerEvent),
}

/// Subscriber that records everything it is told
#[derive(Debug, Default)]
pub struct RecordingHandler {
    log: Mutex<Vec<Recorded>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn player_events(&self) -> Vec<PlayerEvent> {
        self.all()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Player(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn count_player(&self, event: PlayerEvent) -> usize {
        self.player_events().iter().filter(|e| **e == event).count()
    }

    pub fn updates(&self) -> Vec<StatusSnapshot> {
        self.all()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Update(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn last_update(&self) -> Option<StatusSnapshot> {
        self.updates().pop()
    }

    pub fn progress_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|r| matches!(r, Recorded::Progress(_)))
            .count()
    }

    pub fn media_events(&self) -> Vec<MediaEvent> {
        self.all()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Media(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: Recorded) -> HandlerResult {
        self.log.lock().unwrap().push(entry);
        Ok(())
    }
}

impl PlaybackEventHandler for RecordingHandler {
    fn update(&self, status: &StatusSnapshot) -> HandlerResult {
        self.push(Recorded::Update(status.clone()))
    }

    fn update_progress(&self, progress: &Progress) -> HandlerResult {
        self.push(Recorded::Progress(*progress))
    }

    fn on_media_event(&self, event: &MediaEvent) -> HandlerResult {
        self.push(Recorded::Media(*event))
    }

    fn on_player_event(&self, event: &PlayerEvent) -> HandlerResult {
        self.push(Recorded::Player(*event))
    }
}

// ===== Host =====

#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    WakeLock(bool),
    Focus(bool),
    Notification(String),
    HideNotification,
    Metadata(String),
    State(PlaybackState),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHooks(Arc<Mutex<Vec<HookCall>>>);

impl RecordingHooks {
    pub fn calls(&self) -> Vec<HookCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn last_state(&self) -> Option<PlaybackState> {
        self.calls().into_iter().rev().find_map(|call| match call {
            HookCall::State(state) => Some(state),
            _ => None,
        })
    }

    pub fn wake_lock_held(&self) -> bool {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                HookCall::WakeLock(held) => Some(held),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, call: HookCall) {
        self.0.lock().unwrap().push(call);
    }
}

impl HostHooks for RecordingHooks {
    fn acquire_wake_lock(&mut self) {
        self.push(HookCall::WakeLock(true));
    }

    fn release_wake_lock(&mut self) {
        self.push(HookCall::WakeLock(false));
    }

    fn request_audio_focus(&mut self) -> bool {
        self.push(HookCall::Focus(true));
        true
    }

    fn abandon_audio_focus(&mut self) {
        self.push(HookCall::Focus(false));
    }

    fn refresh_notification(&mut self, now_playing: &NowPlaying) {
        self.push(HookCall::Notification(now_playing.title.clone()));
    }

    fn hide_notification(&mut self) {
        self.push(HookCall::HideNotification);
    }

    fn publish_metadata(&mut self, item: &MediaItem) {
        self.push(HookCall::Metadata(item.location.clone()));
    }

    fn publish_state(&mut self, state: PlaybackState) {
        self.push(HookCall::State(state));
    }
}

// ===== Fixture =====

pub struct Fixture {
    pub coordinator: PlaybackCoordinator,
    pub engine: MockEngine,
    pub clock: ManualClock,
    pub network: SharedNetworkStatus,
    pub store: MemoryStore,
    pub hooks: RecordingHooks,
    pub events: Arc<RecordingHandler>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self::build(config, MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::build(ServiceConfig::default(), store)
    }

    fn build(config: ServiceConfig, store: MemoryStore) -> Self {
        let engine = MockEngine::default();
        let clock = ManualClock::new();
        let network = SharedNetworkStatus::new(true);
        let hooks = RecordingHooks::default();
        let events = RecordingHandler::new();

        let mut coordinator = PlaybackCoordinator::new(engine.clone(), config)
            .unwrap()
            .with_hooks(hooks.clone())
            .with_network(Arc::new(network.clone()))
            .with_store(store.clone())
            .with_clock(Arc::new(clock.clone()))
            .with_shuffle_seed(42);
        coordinator.subscribe(events.clone()).unwrap();

        Self {
            coordinator,
            engine,
            clock,
            network,
            store,
            hooks,
            events,
        }
    }

    /// Load `names` as http stream locations (no file checks involved)
    pub fn load_streams(&mut self, names: &[&str]) {
        let items = names.iter().map(|name| MediaItem::new(stream(name))).collect();
        self.coordinator.load(items, None);
    }

    /// Load `names` as local file items
    pub fn load_files(&mut self, names: &[&str]) {
        let items = names.iter().map(|name| MediaItem::new(file(name))).collect();
        self.coordinator.load(items, None);
    }

    /// Move the clock forward and run whatever became due
    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.coordinator.fire_due_timers();
    }

    /// Step the clock in `step` increments until `total` has elapsed
    pub fn run_for(&mut self, total: Duration, step: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            self.advance(step);
            elapsed += step;
        }
    }

    pub fn engine_event(&mut self, event: EngineEvent) {
        self.coordinator.handle_engine_event(event);
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }
}

pub fn stream(name: &str) -> String {
    format!("http://radio.example/{name}")
}

pub fn file(name: &str) -> String {
    format!("file:///music/{name}.mp3")
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
