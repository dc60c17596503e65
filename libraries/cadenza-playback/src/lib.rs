//! Cadenza - Playback Coordination
//!
//! Headless core of a background audio player.
//!
//! This crate provides:
//! - Playlist navigation (linear, shuffle, repeat one / all)
//! - `PlaybackCoordinator`: translates engine events, fans them out to
//!   subscribers and advances the playlist
//! - Sleep timer with drift-compensated ticks and a volume fade-out
//! - Network recovery watchdog for streams that stall while offline
//! - Session persistence (last playlist, position and modes)
//! - `PlaybackService`: runs the coordinator on its own thread
//!
//! # Architecture
//!
//! The coordinator is single-threaded and owns all playback state. Deferred
//! work (progress ticks, sleep timer, network timeout, stall checks) lives in
//! a deadline queue driven by the caller, or by the service thread.
//! Platform pieces are traits: `MediaEngine` decodes and renders,
//! `HostHooks` covers notifications, wake locks and audio focus,
//! `NetworkStatus` answers connectivity and `SessionStore` persists.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadenza_playback::{
//!     PlaybackCoordinator, PlaybackService, RepeatMode, ServiceConfig,
//! };
//! # use cadenza_playback::MediaEngine;
//! # use std::time::Duration;
//! # struct Silent;
//! # impl MediaEngine for Silent {
//! #     fn set_source(&mut self, _: &str) {}
//! #     fn release_media(&mut self) {}
//! #     fn play(&mut self) {}
//! #     fn pause(&mut self) {}
//! #     fn stop(&mut self) {}
//! #     fn set_time(&mut self, _: Duration) {}
//! #     fn time(&self) -> Duration { Duration::ZERO }
//! #     fn length(&self) -> Option<Duration> { None }
//! #     fn set_position(&mut self, _: f32) {}
//! #     fn position(&self) -> f32 { 0.0 }
//! #     fn set_rate(&mut self, _: f32) {}
//! #     fn rate(&self) -> f32 { 1.0 }
//! #     fn set_volume(&mut self, _: u8) {}
//! #     fn volume(&self) -> u8 { 100 }
//! #     fn is_playing(&self) -> bool { false }
//! #     fn is_seekable(&self) -> bool { true }
//! #     fn is_pausable(&self) -> bool { true }
//! # }
//!
//! let coordinator = PlaybackCoordinator::new(Silent, ServiceConfig::default())?;
//! let service = PlaybackService::spawn(coordinator)?;
//!
//! service.post(|c| {
//!     c.load_locations(["https://radio.example/stream", "/music/song.mp3"]);
//!     c.set_repeat(RepeatMode::All);
//!     c.play_index(0);
//! })?;
//!
//! // Engine callbacks go through the sink
//! let sink = service.engine_sink();
//! sink.engine_event(cadenza_playback::EngineEvent::Playing);
//!
//! service.shutdown()?;
//! # Ok::<(), cadenza_playback::PlaybackError>(())
//! ```

mod clock;
mod config;
mod coordinator;
pub mod engine;
mod error;
pub mod events;
mod fade;
pub mod host;
mod navigation;
pub mod remote;
mod service;
mod sleep_timer;
pub mod store;
mod timers;
pub mod types;
mod watchdog;

// Public exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use coordinator::{Outcome, PlaybackCoordinator};
pub use engine::{EngineEvent, MediaEngine, MediaEvent};
pub use error::{HandlerError, PlaybackError, Result};
pub use events::{
    HandlerResult, PlaybackEventHandler, PlayerEvent, Progress, StatusSnapshot, SubscriptionId,
    Subscribers,
};
pub use fade::{FadeCancel, FadeOut, FadePacer, ManualPacer, ThreadPacer};
pub use host::{HostHooks, NetworkStatus, NoopHooks, SharedNetworkStatus};
pub use navigation::{NavigationState, Removal};
pub use remote::{AudioRoute, FocusChange, HeadsetButton, RemoteAction};
pub use service::{EngineSink, PlaybackService, ServiceHandle};
pub use sleep_timer::{SleepStep, SleepTimer, SleepTimerStatus};
pub use store::{JsonFileStore, MemoryStore, SavedSession, SessionStore};
pub use timers::{TimerKind, TimerQueue};
pub use types::{NowPlaying, PlaybackState, RepeatMode, SeekInterval};
pub use watchdog::{Armed, NetworkWatchdog};

pub use cadenza_core::{MediaItem, MediaKind, MediaMeta, MetaField};
