//! Sleep timer fade-out
//!
//! A fade lowers the volume by a fixed amount every step until it reaches
//! zero, then playback is paused and the volume put back. The steps are
//! paced by a `FadePacer`; the coordinator applies each step itself so the
//! engine is only ever touched from its own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

/// Shared early-exit flag for one fade
#[derive(Debug, Clone, Default)]
pub struct FadeCancel(Arc<AtomicBool>);

impl FadeCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One running fade
#[derive(Debug)]
pub struct FadeOut {
    id: u64,
    restore_volume: u8,
    decrement: u8,
    cancel: FadeCancel,
}

impl FadeOut {
    /// Plan a fade from `restore_volume` to zero over roughly `duration`
    pub fn new(id: u64, restore_volume: u8, step: Duration, duration: Duration) -> Self {
        Self {
            id,
            restore_volume,
            decrement: decrement_per_step(step, duration),
            cancel: FadeCancel::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Volume in effect before the fade started
    pub fn restore_volume(&self) -> u8 {
        self.restore_volume
    }

    pub fn decrement(&self) -> u8 {
        self.decrement
    }

    pub fn cancel_flag(&self) -> FadeCancel {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Volume after one more step from `current`
    pub fn next_volume(&self, current: u8) -> u8 {
        current.saturating_sub(self.decrement)
    }
}

/// Volume points removed per step: step / duration * 100, at least one
fn decrement_per_step(step: Duration, duration: Duration) -> u8 {
    if duration.is_zero() {
        return 100;
    }
    let points = step.as_millis() * 100 / duration.as_millis().max(1);
    points.clamp(1, 100) as u8
}

/// Drives the steps of a fade
pub trait FadePacer: Send {
    /// Begin pacing fade `fade_id` every `step` until `cancel` is set
    fn start(&mut self, fade_id: u64, step: Duration, cancel: FadeCancel);
}

/// Pacer that never fires; the owner calls `fade_step` by hand
#[derive(Debug, Default)]
pub struct ManualPacer {
    started: Vec<u64>,
}

impl ManualPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fades started so far
    pub fn started(&self) -> &[u64] {
        &self.started
    }
}

impl FadePacer for ManualPacer {
    fn start(&mut self, fade_id: u64, _step: Duration, _cancel: FadeCancel) {
        self.started.push(fade_id);
    }
}

/// Pacer backed by a worker thread that sleeps between steps
///
/// `post` delivers a step to the owner; returning false ends the worker.
pub struct ThreadPacer<F> {
    post: F,
}

impl<F> ThreadPacer<F>
where
    F: Fn(u64) -> bool + Clone + Send + 'static,
{
    pub fn new(post: F) -> Self {
        Self { post }
    }
}

impl<F> FadePacer for ThreadPacer<F>
where
    F: Fn(u64) -> bool + Clone + Send + 'static,
{
    fn start(&mut self, fade_id: u64, step: Duration, cancel: FadeCancel) {
        if let Err(e) = spawn_pacer(fade_id, step, cancel, self.post.clone()) {
            warn!(fade_id, error = %e, "Failed to spawn fade worker");
        }
    }
}

fn spawn_pacer<F>(
    fade_id: u64,
    step: Duration,
    cancel: FadeCancel,
    post: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: Fn(u64) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name(format!("cadenza-fade-{fade_id}"))
        .spawn(move || {
            loop {
                thread::sleep(step);
                if cancel.is_cancelled() || !post(fade_id) {
                    break;
                }
            }
            debug!(fade_id, "fade worker exiting");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn default_fade_removes_five_points_per_step() {
        let fade = FadeOut::new(1, 100, Duration::from_millis(250), Duration::from_secs(5));
        assert_eq!(fade.decrement(), 5);
        assert_eq!(fade.next_volume(100), 95);
        assert_eq!(fade.next_volume(3), 0);
    }

    #[test]
    fn decrement_is_bounded() {
        let slow = FadeOut::new(1, 100, Duration::from_millis(10), Duration::from_secs(60));
        assert_eq!(slow.decrement(), 1);

        let instant = FadeOut::new(1, 100, Duration::from_millis(250), Duration::ZERO);
        assert_eq!(instant.decrement(), 100);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let fade = FadeOut::new(1, 80, Duration::from_millis(250), Duration::from_secs(5));
        let flag = fade.cancel_flag();
        fade.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn thread_pacer_posts_until_cancelled() {
        let (tx, rx) = unbounded();
        let mut pacer = ThreadPacer::new(move |id| tx.send(id).is_ok());
        let cancel = FadeCancel::new();

        pacer.start(9, Duration::from_millis(5), cancel.clone());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(9));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(9));

        cancel.cancel();
        // drain whatever was in flight, then the worker stays quiet
        while rx.recv_timeout(Duration::from_millis(50)).is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
