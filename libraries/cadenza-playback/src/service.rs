//! Playback service thread
//!
//! Runs a `PlaybackCoordinator` on its own thread. Everything that touches
//! the coordinator (client calls, engine callbacks, connectivity changes,
//! fade steps, timer deadlines) arrives through one mailbox and is handled
//! in order, so no coordinator state is ever shared between threads.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::coordinator::PlaybackCoordinator;
use crate::engine::{EngineEvent, MediaEvent};
use crate::error::{PlaybackError, Result};
use crate::fade::ThreadPacer;

type Job = Box<dyn FnOnce(&mut PlaybackCoordinator) + Send>;

/// Mailbox entries processed by the service thread
enum Message {
    Call(Job),
    Engine(EngineEvent),
    Media(MediaEvent),
    Connectivity(bool),
    FadeStep(u64),
    Shutdown,
}

/// Spawns the service thread
pub struct PlaybackService;

impl PlaybackService {
    /// Move `coordinator` onto a new thread and return a handle to it
    ///
    /// Fade-outs are paced by worker threads posting back to the mailbox.
    pub fn spawn(mut coordinator: PlaybackCoordinator) -> Result<ServiceHandle> {
        let (tx, rx) = unbounded();

        let fade_tx = tx.clone();
        coordinator.set_fade_pacer(Box::new(ThreadPacer::new(move |fade_id| {
            fade_tx.send(Message::FadeStep(fade_id)).is_ok()
        })));

        let thread = thread::Builder::new()
            .name("cadenza-playback".to_string())
            .spawn(move || run(coordinator, &rx))?;

        Ok(ServiceHandle {
            tx: tx.clone(),
            worker: Arc::new(Worker {
                tx,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }
}

fn run(mut coordinator: PlaybackCoordinator, rx: &Receiver<Message>) {
    info!("playback service started");

    loop {
        let message = match coordinator.time_until_next_timer() {
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match message {
            Some(Message::Call(job)) => job(&mut coordinator),
            Some(Message::Engine(event)) => coordinator.handle_engine_event(event),
            Some(Message::Media(event)) => coordinator.handle_media_event(event),
            Some(Message::Connectivity(online)) => coordinator.connectivity_changed(online),
            Some(Message::FadeStep(fade_id)) => coordinator.fade_step(fade_id),
            Some(Message::Shutdown) => {
                coordinator.stop_service();
                break;
            }
            None => {}
        }

        coordinator.fire_due_timers();
    }

    info!("playback service stopped");
}

/// Owns the thread; the last handle to go away tells it to stop
struct Worker {
    tx: Sender<Message>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // The thread may already be gone after an explicit shutdown
        self.tx.send(Message::Shutdown).ok();
    }
}

/// Client handle to a running service
///
/// Cheap to clone. Do not call `call` from inside a subscriber: subscribers
/// run on the service thread and would wait on themselves.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: Sender<Message>,
    worker: Arc<Worker>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle").finish_non_exhaustive()
    }
}

impl ServiceHandle {
    /// Run `f` on the service thread and wait for its result
    pub fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut PlaybackCoordinator) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(Message::Call(Box::new(move |coordinator| {
            reply_tx.send(f(coordinator)).ok();
        })))?;
        reply_rx.recv().map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Queue `f` on the service thread without waiting
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut PlaybackCoordinator) + Send + 'static,
    {
        self.send(Message::Call(Box::new(f)))
    }

    pub fn play(&self) -> Result<()> {
        self.post(PlaybackCoordinator::play)
    }

    pub fn pause(&self) -> Result<()> {
        self.post(PlaybackCoordinator::pause)
    }

    pub fn next(&self) -> Result<()> {
        self.post(PlaybackCoordinator::next)
    }

    pub fn previous(&self) -> Result<()> {
        self.post(PlaybackCoordinator::previous)
    }

    pub fn play_index(&self, index: usize) -> Result<()> {
        self.post(move |coordinator| coordinator.play_index(index))
    }

    /// Report a connectivity change from the host's listener
    pub fn connectivity_changed(&self, online: bool) -> Result<()> {
        self.send(Message::Connectivity(online))
    }

    /// Sender for the engine's callback thread
    pub fn engine_sink(&self) -> EngineSink {
        EngineSink {
            tx: self.tx.clone(),
        }
    }

    /// Stop playback, drop subscribers and wait for the thread to exit
    pub fn shutdown(&self) -> Result<()> {
        let thread = self
            .worker
            .thread
            .lock()
            .map_err(|_| PlaybackError::ServiceStopped)?
            .take();
        let Some(thread) = thread else {
            debug!("service already shut down");
            return Ok(());
        };

        self.send(Message::Shutdown).ok();
        thread.join().map_err(|_| {
            warn!("Playback service thread panicked");
            PlaybackError::ServiceStopped
        })
    }

    fn send(&self, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| PlaybackError::ServiceStopped)
    }
}

/// Forwards engine callbacks into the service mailbox
///
/// Sends never block; events after shutdown are dropped.
#[derive(Clone)]
pub struct EngineSink {
    tx: Sender<Message>,
}

impl std::fmt::Debug for EngineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSink").finish_non_exhaustive()
    }
}

impl EngineSink {
    pub fn engine_event(&self, event: EngineEvent) {
        if self.tx.send(Message::Engine(event)).is_err() {
            debug!(?event, "engine event after shutdown dropped");
        }
    }

    pub fn media_event(&self, event: MediaEvent) {
        if self.tx.send(Message::Media(event)).is_err() {
            debug!(?event, "media event after shutdown dropped");
        }
    }
}
