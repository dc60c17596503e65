//! Core types for playback coordination

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlaybackError;

/// Repeat mode
///
/// Precedence when computing the next index: `One` > shuffle > linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop when the list ends
    #[default]
    None,

    /// Loop current item only
    One,

    /// Loop entire list
    All,
}

/// Coarse playback state as seen by subscribers and the host session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No current item
    Idle,

    /// Engine is rendering
    Playing,

    /// Paused mid-item
    Paused,

    /// Stopped; terminal until the next load or play-index
    Stopped,

    /// Stream stalled, waiting for connectivity to come back
    WaitingForNetwork,
}

/// Seek step used by remote forward/backward actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeekInterval(u32);

impl SeekInterval {
    /// Supported intervals in seconds
    pub const SUPPORTED: [u32; 4] = [5, 15, 30, 60];

    pub fn seconds(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Default for SeekInterval {
    fn default() -> Self {
        Self(15)
    }
}

impl TryFrom<u32> for SeekInterval {
    type Error = PlaybackError;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        if Self::SUPPORTED.contains(&seconds) {
            Ok(Self(seconds))
        } else {
            Err(PlaybackError::InvalidSeekInterval(seconds))
        }
    }
}

impl From<SeekInterval> for u32 {
    fn from(interval: SeekInterval) -> Self {
        interval.0
    }
}

/// Display data handed to the host notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: String,
    pub subtitle: String,
    pub artwork_url: Option<String>,
    pub playing: bool,
    pub seek_interval: SeekInterval,
}
