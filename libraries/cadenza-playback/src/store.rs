//! Session persistence
//!
//! The last playlist, position and modes are saved per media kind, so an
//! audio session never overwrites the resume point of a video session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cadenza_core::MediaKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlaybackError, Result};
use crate::types::RepeatMode;

/// Everything needed to resume a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedSession {
    pub locations: Vec<String>,

    /// Index to start from on the next `play`
    pub index: Option<usize>,

    /// Offset into that item, in milliseconds
    pub time_ms: u64,

    pub shuffling: bool,
    pub repeat: RepeatMode,
}

/// Key-value persistence for sessions
pub trait SessionStore: Send {
    fn load(&self, kind: MediaKind) -> Result<Option<SavedSession>>;
    fn save(&mut self, kind: MediaKind, session: &SavedSession) -> Result<()>;
}

/// In-memory store; clones share the same sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<Mutex<HashMap<MediaKind, SavedSession>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<MediaKind, SavedSession>>> {
        self.sessions
            .lock()
            .map_err(|_| PlaybackError::Store("session map poisoned".to_string()))
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, kind: MediaKind) -> Result<Option<SavedSession>> {
        Ok(self.lock()?.get(&kind).cloned())
    }

    fn save(&mut self, kind: MediaKind, session: &SavedSession) -> Result<()> {
        self.lock()?.insert(kind, session.clone());
        Ok(())
    }
}

/// On-disk layout of `JsonFileStore`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SessionFile {
    audio: Option<SavedSession>,
    video: Option<SavedSession>,
}

impl SessionFile {
    fn slot(&mut self, kind: MediaKind) -> &mut Option<SavedSession> {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }
}

/// Store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SessionFile> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self, kind: MediaKind) -> Result<Option<SavedSession>> {
        Ok(self.read()?.slot(kind).clone())
    }

    fn save(&mut self, kind: MediaKind, session: &SavedSession) -> Result<()> {
        let mut file = self.read()?;
        *file.slot(kind) = Some(session.clone());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %self.path.display(), ?kind, "session saved");
        Ok(())
    }
}
