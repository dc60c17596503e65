//! Remote controls: media buttons, headset and audio focus

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Press held at least this long counts as a long click
pub const LONG_PRESS: Duration = Duration::from_millis(1000);

/// Second click within this long after the first counts as a double click
pub const DOUBLE_CLICK: Duration = Duration::from_millis(500);

/// Transport commands from notifications, lock screen and media buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteAction {
    Play,
    PlayPause,
    Pause,

    /// Stops the whole service, subscribers included
    Stop,

    /// Seek back by the configured interval
    Backward,

    /// Seek forward by the configured interval
    Forward,
}

/// Headset presence changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioRoute {
    /// Output is about to switch to the speaker (headset unplugged)
    BecomingNoisy,

    HeadsetPlugged,
}

/// Audio focus notifications from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Turns single-button headset presses into actions
///
/// One click toggles play/pause, a long click seeks back and a double click
/// seeks forward. Timestamps are any monotonic clock offsets.
#[derive(Debug, Clone, Default)]
pub struct HeadsetButton {
    down_at: Duration,
    last_click_at: Option<Duration>,
}

impl HeadsetButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key went down; auto-repeat presses are ignored
    pub fn key_down(&mut self, at: Duration, repeat_count: u32) {
        if repeat_count == 0 {
            self.down_at = at;
        }
    }

    /// Key came up; returns the action to perform
    pub fn key_up(&mut self, at: Duration) -> RemoteAction {
        if at.saturating_sub(self.down_at) >= LONG_PRESS {
            return RemoteAction::Backward;
        }
        if let Some(last) = self.last_click_at {
            if at.saturating_sub(last) <= DOUBLE_CLICK {
                return RemoteAction::Forward;
            }
        }
        self.last_click_at = Some(at);
        RemoteAction::PlayPause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn click(button: &mut HeadsetButton, down: u64, up: u64) -> RemoteAction {
        button.key_down(ms(down), 0);
        button.key_up(ms(up))
    }

    #[test]
    fn single_click_toggles() {
        let mut button = HeadsetButton::new();
        assert_eq!(click(&mut button, 10_000, 10_100), RemoteAction::PlayPause);
        assert_eq!(click(&mut button, 12_000, 12_100), RemoteAction::PlayPause);
    }

    #[test]
    fn long_press_seeks_back() {
        let mut button = HeadsetButton::new();
        assert_eq!(click(&mut button, 10_000, 10_999), RemoteAction::PlayPause);
        assert_eq!(click(&mut button, 20_000, 21_000), RemoteAction::Backward);
    }

    #[test]
    fn double_click_seeks_forward() {
        let mut button = HeadsetButton::new();
        assert_eq!(click(&mut button, 10_000, 10_100), RemoteAction::PlayPause);
        assert_eq!(click(&mut button, 10_300, 10_600), RemoteAction::Forward);
    }

    #[test]
    fn repeated_key_down_keeps_first_timestamp() {
        let mut button = HeadsetButton::new();
        button.key_down(ms(10_000), 0);
        button.key_down(ms(10_800), 1);
        assert_eq!(button.key_up(ms(11_000)), RemoteAction::Backward);
    }
}
