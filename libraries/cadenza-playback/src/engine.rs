//! Media engine abstraction
//!
//! The engine decodes and renders; the coordinator only drives it through
//! this trait and reacts to the events it reports. Events are delivered to
//! the coordinator's mailbox from whatever thread the engine uses.

use cadenza_core::{MediaItem, MediaMeta, MetaField};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Black-box player owned by the coordinator
///
/// Volume is 0-100 (100 is normal volume). Implementations should be
/// non-blocking; state changes are confirmed later through `EngineEvent`s.
pub trait MediaEngine: Send {
    /// Hand a new location to the player (does not start it)
    fn set_source(&mut self, location: &str);

    /// Drop the current media handle
    fn release_media(&mut self);

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);

    fn set_time(&mut self, time: Duration);
    fn time(&self) -> Duration;

    /// Length of the current media, `None` while unknown (e.g. live streams)
    fn length(&self) -> Option<Duration>;

    /// Seek to a fraction (0.0-1.0) of the media
    fn set_position(&mut self, position: f32);
    fn position(&self) -> f32;

    fn set_rate(&mut self, rate: f32);
    fn rate(&self) -> f32;

    fn set_volume(&mut self, volume: u8);
    fn volume(&self) -> u8;

    fn is_playing(&self) -> bool;
    fn is_seekable(&self) -> bool;
    fn is_pausable(&self) -> bool;

    /// Sub-items discovered in the current media (playlist files, etc.)
    ///
    /// Taking them clears the engine's list.
    fn take_sub_items(&mut self) -> Vec<MediaItem> {
        Vec::new()
    }

    /// Metadata the engine has read for the current media
    fn current_meta(&self) -> Option<MediaMeta> {
        None
    }
}

/// Player lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    Opening,
    Playing,
    Paused,
    Stopped,

    /// Playback reached the end of the media (or the stream dropped)
    EndReached,

    EncounteredError,

    TimeChanged(Duration),
    PositionChanged(f32),
    SeekableChanged(bool),
    PausableChanged(bool),

    ElementaryStreamAdded,
    ElementaryStreamDeleted,

    /// Video output count changed
    Vout(u32),
}

/// Events about the current media rather than the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// One metadata field changed
    MetaChanged(MetaField),

    /// Parsing finished
    ParsedChanged,

    SubItemAdded,
    DurationChanged,
}
