//! Deadline queue for the coordinator's deferred work
//!
//! At most one deadline is kept per `TimerKind`; scheduling an already
//! pending kind replaces its deadline. Kinds that belong to a replaceable
//! component carry that component's instance id, and the owner re-checks
//! the id when the timer fires, so a stale deadline never takes effect.

use std::collections::HashMap;
use std::time::Duration;

/// Identifies one deferred callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic progress notification
    Progress,

    /// Sleep timer countdown for the timer instance with this id
    SleepTimer(u64),

    /// Network recovery deadline for the watchdog arming with this id
    NetworkTimeout(u64),

    /// No time progress while playing offline
    StallCheck,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    deadlines: HashMap<TimerKind, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` at absolute clock offset `at`, replacing any pending one
    pub fn schedule(&mut self, kind: TimerKind, at: Duration) {
        self.deadlines.insert(kind, at);
    }

    /// Drop a pending deadline; cancelling twice is a no-op
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Duration> {
        self.deadlines.get(&kind).copied()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every kind due at `now`, earliest first
    pub fn pop_due(&mut self, now: Duration) -> Vec<TimerKind> {
        let mut due: Vec<(Duration, TimerKind)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(kind, at)| (*at, *kind))
            .collect();
        due.sort_by_key(|(at, _)| *at);

        for (_, kind) in &due {
            self.deadlines.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn rescheduling_replaces_deadline() {
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::Progress, ms(1000));
        queue.schedule(TimerKind::Progress, ms(3000));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), Some(ms(3000)));
        assert!(queue.pop_due(ms(2000)).is_empty());
    }

    #[test]
    fn pop_due_orders_by_deadline() {
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::StallCheck, ms(500));
        queue.schedule(TimerKind::SleepTimer(1), ms(200));
        queue.schedule(TimerKind::NetworkTimeout(1), ms(900));

        assert_eq!(
            queue.pop_due(ms(600)),
            vec![TimerKind::SleepTimer(1), TimerKind::StallCheck]
        );
        assert_eq!(queue.next_deadline(), Some(ms(900)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::SleepTimer(7), ms(100));
        assert!(queue.cancel(TimerKind::SleepTimer(7)));
        assert!(!queue.cancel(TimerKind::SleepTimer(7)));
        assert!(queue.pop_due(ms(1000)).is_empty());
    }

    #[test]
    fn instance_ids_are_distinct_kinds() {
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::SleepTimer(1), ms(100));
        queue.schedule(TimerKind::SleepTimer(2), ms(100));
        queue.cancel(TimerKind::SleepTimer(1));
        assert_eq!(queue.pop_due(ms(100)), vec![TimerKind::SleepTimer(2)]);
    }
}
