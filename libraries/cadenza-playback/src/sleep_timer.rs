//! Pausable countdown driving the sleep timer
//!
//! The timer itself never sleeps or spawns anything: it answers "what should
//! happen at `now`" and hands back the next deadline, which the coordinator
//! keeps in its `TimerQueue` under `TimerKind::SleepTimer(id)`.

use std::time::Duration;

/// Lifecycle of one countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTimerStatus {
    Running,
    Paused,
    Cancelled,
    Finished,
}

/// What the owner has to do after driving the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStep {
    /// Report `remaining`, then ask `next_tick` for the following deadline
    Tick { remaining: Duration },

    /// Less than one interval left; come back at `next` without reporting
    Wait { next: Duration },

    /// Countdown reached zero
    Finished,

    /// Nothing to do (paused, cancelled or already finished)
    Idle,
}

#[derive(Debug, Clone)]
pub struct SleepTimer {
    id: u64,
    duration: Duration,
    interval: Duration,

    /// Clock offset at which the countdown ends, valid while running
    stop_at: Duration,

    remaining_at_pause: Duration,
    status: SleepTimerStatus,
}

impl SleepTimer {
    /// Create a stopped countdown of `duration` reporting every `interval`
    pub fn new(id: u64, duration: Duration, interval: Duration) -> Self {
        Self {
            id,
            duration,
            interval,
            stop_at: Duration::ZERO,
            remaining_at_pause: duration,
            status: SleepTimerStatus::Paused,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> SleepTimerStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.status == SleepTimerStatus::Paused
    }

    pub fn is_finished_or_cancelled(&self) -> bool {
        matches!(
            self.status,
            SleepTimerStatus::Finished | SleepTimerStatus::Cancelled
        )
    }

    /// Begin counting down, optionally in the paused state
    ///
    /// A zero duration finishes on the spot.
    pub fn start(&mut self, paused: bool, now: Duration) -> SleepStep {
        if self.duration.is_zero() {
            self.status = SleepTimerStatus::Finished;
            return SleepStep::Finished;
        }

        self.stop_at = now + self.duration;
        self.remaining_at_pause = self.duration;
        if paused {
            self.status = SleepTimerStatus::Paused;
            SleepStep::Idle
        } else {
            self.status = SleepTimerStatus::Running;
            SleepStep::Wait { next: now }
        }
    }

    /// Freeze the countdown, returning what is left
    pub fn pause(&mut self, now: Duration) -> Duration {
        if self.status == SleepTimerStatus::Running {
            self.remaining_at_pause = self.stop_at.saturating_sub(now);
            self.status = SleepTimerStatus::Paused;
        }
        self.remaining_at_pause
    }

    /// Continue a paused countdown
    ///
    /// Returns the remaining time and the step to schedule.
    pub fn resume(&mut self, now: Duration) -> (Duration, SleepStep) {
        if self.status != SleepTimerStatus::Paused {
            return (self.remaining(now), SleepStep::Idle);
        }
        self.stop_at = now + self.remaining_at_pause;
        self.status = SleepTimerStatus::Running;
        (self.remaining_at_pause, SleepStep::Wait { next: now })
    }

    /// Stop for good; true if the timer was still live
    pub fn cancel(&mut self) -> bool {
        if self.is_finished_or_cancelled() {
            return false;
        }
        self.status = SleepTimerStatus::Cancelled;
        true
    }

    /// Time left before the countdown finishes
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.status {
            SleepTimerStatus::Running => self.stop_at.saturating_sub(now),
            SleepTimerStatus::Paused => self.remaining_at_pause,
            SleepTimerStatus::Cancelled | SleepTimerStatus::Finished => Duration::ZERO,
        }
    }

    /// Handle a due deadline
    pub fn fire(&mut self, now: Duration) -> SleepStep {
        if self.status != SleepTimerStatus::Running {
            return SleepStep::Idle;
        }

        let left = self.stop_at.saturating_sub(now);
        if left.is_zero() {
            self.status = SleepTimerStatus::Finished;
            SleepStep::Finished
        } else if left < self.interval {
            SleepStep::Wait { next: now + left }
        } else {
            SleepStep::Tick { remaining: left }
        }
    }

    /// Deadline for the tick after one that started at `tick_start`
    ///
    /// Time spent reporting the tick is absorbed; a report that overran the
    /// interval skips ahead to the next interval boundary.
    pub fn next_tick(&self, tick_start: Duration, now: Duration) -> Option<Duration> {
        if self.status != SleepTimerStatus::Running || self.interval.is_zero() {
            return None;
        }
        let mut next = tick_start + self.interval;
        while next < now {
            next += self.interval;
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn running(duration: u64) -> SleepTimer {
        let mut timer = SleepTimer::new(1, ms(duration), ms(1000));
        assert_eq!(timer.start(false, ms(0)), SleepStep::Wait { next: ms(0) });
        timer
    }

    #[test]
    fn ticks_until_less_than_an_interval_remains() {
        let mut timer = running(3500);

        assert_eq!(timer.fire(ms(0)), SleepStep::Tick { remaining: ms(3500) });
        assert_eq!(timer.next_tick(ms(0), ms(10)), Some(ms(1000)));

        assert_eq!(timer.fire(ms(3000)), SleepStep::Wait { next: ms(3500) });
        assert_eq!(timer.fire(ms(3500)), SleepStep::Finished);
        assert_eq!(timer.status(), SleepTimerStatus::Finished);
        assert_eq!(timer.fire(ms(4000)), SleepStep::Idle);
    }

    #[test]
    fn slow_tick_skips_to_next_boundary() {
        let timer = running(60_000);
        assert_eq!(timer.next_tick(ms(1000), ms(3200)), Some(ms(4000)));
        assert_eq!(timer.next_tick(ms(1000), ms(3000)), Some(ms(3000)));
    }

    #[test]
    fn start_paused_holds_full_duration() {
        let mut timer = SleepTimer::new(1, ms(10_000), ms(1000));
        assert_eq!(timer.start(true, ms(500)), SleepStep::Idle);
        assert!(timer.is_paused());
        assert_eq!(timer.remaining(ms(9000)), ms(10_000));
        assert_eq!(timer.fire(ms(9000)), SleepStep::Idle);
    }

    #[test]
    fn pause_and_resume_preserve_remaining() {
        let mut timer = running(10_000);
        assert_eq!(timer.pause(ms(4000)), ms(6000));
        assert_eq!(timer.remaining(ms(8000)), ms(6000));

        let (remaining, step) = timer.resume(ms(8000));
        assert_eq!(remaining, ms(6000));
        assert_eq!(step, SleepStep::Wait { next: ms(8000) });
        assert_eq!(timer.remaining(ms(9000)), ms(5000));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timer = running(10_000);
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert_eq!(timer.remaining(ms(100)), Duration::ZERO);
        assert_eq!(timer.fire(ms(100)), SleepStep::Idle);
        assert_eq!(timer.next_tick(ms(0), ms(100)), None);
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut timer = SleepTimer::new(3, Duration::ZERO, ms(1000));
        assert_eq!(timer.start(false, ms(0)), SleepStep::Finished);
        assert!(timer.is_finished_or_cancelled());
        assert!(!timer.cancel());
    }
}
