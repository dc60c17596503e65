//! Service configuration

use crate::error::{PlaybackError, Result};
use crate::types::SeekInterval;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Remote forward/backward step (5, 15, 30 or 60 seconds)
    #[serde(default)]
    pub seek_interval_secs: SeekInterval,

    /// Period of progress notifications while playing
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Period of sleep timer ticks
    #[serde(default = "default_sleep_timer_tick_ms")]
    pub sleep_timer_tick_ms: u64,

    /// Total length of the volume fade when the sleep timer finishes
    #[serde(default = "default_sleep_fade_duration_ms")]
    pub sleep_fade_duration_ms: u64,

    /// Time between two volume decrements during the fade
    #[serde(default = "default_fade_step_ms")]
    pub fade_step_ms: u64,

    /// How long a stalled stream may wait for connectivity
    #[serde(default = "default_network_recovery_window_ms")]
    pub network_recovery_window_ms: u64,

    /// Missing time-progress longer than this while offline counts as a stall
    #[serde(default = "default_stall_grace_ms")]
    pub stall_grace_ms: u64,

    /// Remaining time above which an end-of-stream is treated as a stall
    #[serde(default = "default_stream_end_slack_ms")]
    pub stream_end_slack_ms: u64,

    /// React to headset unplug/plug
    #[serde(default = "default_detect_headset")]
    pub detect_headset: bool,

    /// Volume while ducked for a transient focus loss
    #[serde(default = "default_duck_volume")]
    pub duck_volume: u8,
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Environment variables use the `CADENZA_` prefix, e.g.
    /// `CADENZA_SEEK_INTERVAL_SECS=30`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            }
        }

        settings = settings.add_source(config::Environment::with_prefix("CADENZA").try_parsing(true));

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("progress_interval_ms", self.progress_interval_ms),
            ("sleep_timer_tick_ms", self.sleep_timer_tick_ms),
            ("fade_step_ms", self.fade_step_ms),
            ("network_recovery_window_ms", self.network_recovery_window_ms),
            ("stall_grace_ms", self.stall_grace_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(PlaybackError::Config(format!("{name} must be greater than 0")));
            }
        }

        if self.duck_volume > 100 {
            return Err(PlaybackError::Config(format!(
                "duck_volume must be 0-100, got {}",
                self.duck_volume
            )));
        }

        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn sleep_timer_tick(&self) -> Duration {
        Duration::from_millis(self.sleep_timer_tick_ms)
    }

    pub fn sleep_fade_duration(&self) -> Duration {
        Duration::from_millis(self.sleep_fade_duration_ms)
    }

    pub fn fade_step(&self) -> Duration {
        Duration::from_millis(self.fade_step_ms)
    }

    pub fn network_recovery_window(&self) -> Duration {
        Duration::from_millis(self.network_recovery_window_ms)
    }

    pub fn stall_grace(&self) -> Duration {
        Duration::from_millis(self.stall_grace_ms)
    }

    pub fn stream_end_slack(&self) -> Duration {
        Duration::from_millis(self.stream_end_slack_ms)
    }
}

// Default values
fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_sleep_timer_tick_ms() -> u64 {
    1000
}

fn default_sleep_fade_duration_ms() -> u64 {
    5000
}

fn default_fade_step_ms() -> u64 {
    250
}

fn default_network_recovery_window_ms() -> u64 {
    30_000
}

fn default_stall_grace_ms() -> u64 {
    5000
}

fn default_stream_end_slack_ms() -> u64 {
    1000
}

fn default_detect_headset() -> bool {
    true
}

fn default_duck_volume() -> u8 {
    36
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            seek_interval_secs: SeekInterval::default(),
            progress_interval_ms: default_progress_interval_ms(),
            sleep_timer_tick_ms: default_sleep_timer_tick_ms(),
            sleep_fade_duration_ms: default_sleep_fade_duration_ms(),
            fade_step_ms: default_fade_step_ms(),
            network_recovery_window_ms: default_network_recovery_window_ms(),
            stall_grace_ms: default_stall_grace_ms(),
            stream_end_slack_ms: default_stream_end_slack_ms(),
            detect_headset: default_detect_headset(),
            duck_volume: default_duck_volume(),
        }
    }
}
