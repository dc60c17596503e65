//! Network recovery watchdog
//!
//! Armed when a non-local stream stalls while the device is offline. While
//! armed the coordinator suppresses terminal engine events; the watchdog ends
//! either through reconnection (recover from the saved position) or through
//! its deadline (give up and stop).

use std::time::Duration;
use tracing::debug;

/// State captured when the watchdog was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub id: u64,

    /// Clock offset of the disconnect
    pub since: Duration,

    /// Playback position to resume from
    pub saved_time: Duration,
}

#[derive(Debug, Clone)]
pub struct NetworkWatchdog {
    window: Duration,
    armed: Option<Armed>,
    next_id: u64,
}

impl NetworkWatchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
            next_id: 1,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed(&self) -> Option<Armed> {
        self.armed
    }

    /// Arm at `now`; returns the new arming and its deadline
    ///
    /// Arming while already armed changes nothing and returns `None`.
    pub fn arm(&mut self, now: Duration, saved_time: Duration) -> Option<(Armed, Duration)> {
        if self.armed.is_some() {
            return None;
        }

        let armed = Armed {
            id: self.next_id,
            since: now,
            saved_time,
        };
        self.next_id += 1;
        self.armed = Some(armed);
        debug!(id = armed.id, ?saved_time, "network watchdog armed");
        Some((armed, now + self.window))
    }

    /// Stand down, returning what was captured at arming time
    pub fn disarm(&mut self) -> Option<Armed> {
        self.armed.take()
    }

    /// Deadline `id` elapsed; true if it belongs to the live arming
    pub fn expire(&mut self, id: u64) -> bool {
        match self.armed {
            Some(armed) if armed.id == id => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}
