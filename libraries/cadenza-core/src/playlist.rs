//! Ordered, mutable media list
//!
//! Insertion order is playback order. Direct mutation is strict: every
//! index-taking operation fails with `IndexOutOfBounds` instead of clamping.
//! While the list is observed, each applied mutation queues exactly one
//! `ListChange`; the owner drains them right after the call and repairs its
//! own index state (see `PlaybackCoordinator`).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::error::{CoreError, Result};
use crate::media::MediaItem;

/// Structured change emitted by a playlist mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListChange {
    /// Item inserted so that it now sits at `index`
    Added { index: usize, location: String },

    /// Item that sat at `index` was removed
    Removed { index: usize, location: String },

    /// Item moved from `from` to the insertion point `to`
    ///
    /// `to` is measured before removal, so the item ends up at `to - 1`
    /// when moving forward and at `to` when moving backward.
    Moved {
        from: usize,
        to: usize,
        location: String,
    },

    /// All `len` items were removed at once
    Cleared { len: usize },
}

/// Ordered list of media items
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    items: Vec<MediaItem>,

    /// Whether mutations are recorded in `changes`
    observed: bool,

    changes: Vec<ListChange>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an unobserved playlist from items
    pub fn from_items(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            observed: false,
            changes: Vec::new(),
        }
    }

    /// Start or stop recording change events
    pub fn set_observed(&mut self, observed: bool) {
        self.observed = observed;
        if !observed {
            self.changes.clear();
        }
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }

    /// Take all change events recorded since the last drain
    pub fn drain_changes(&mut self) -> Vec<ListChange> {
        std::mem::take(&mut self.changes)
    }

    fn record(&mut self, change: ListChange) {
        trace!(?change, "playlist changed");
        if self.observed {
            self.changes.push(change);
        }
    }

    /// Append an item at the end
    pub fn add(&mut self, item: MediaItem) {
        let index = self.items.len();
        let location = item.location.clone();
        self.items.push(item);
        self.record(ListChange::Added { index, location });
    }

    /// Insert an item so that it sits at `index` (`index == len` appends)
    pub fn insert(&mut self, index: usize, item: MediaItem) -> Result<()> {
        if index > self.items.len() {
            return Err(CoreError::out_of_bounds(index, self.items.len()));
        }
        let location = item.location.clone();
        self.items.insert(index, item);
        self.record(ListChange::Added { index, location });
        Ok(())
    }

    /// Remove and return the item at `index`
    pub fn remove(&mut self, index: usize) -> Result<MediaItem> {
        if index >= self.items.len() {
            return Err(CoreError::out_of_bounds(index, self.items.len()));
        }
        let item = self.items.remove(index);
        self.record(ListChange::Removed {
            index,
            location: item.location.clone(),
        });
        Ok(item)
    }

    /// Remove every item with this location, returning how many were removed
    ///
    /// Each removed entry is its own mutation and emits its own event.
    pub fn remove_location(&mut self, location: &str) -> Result<usize> {
        let mut removed = 0;
        let mut index = 0;
        while index < self.items.len() {
            if self.items[index].location == location {
                self.remove(index)?;
                removed += 1;
            } else {
                index += 1;
            }
        }

        if removed == 0 {
            return Err(CoreError::LocationNotFound(location.to_string()));
        }
        Ok(removed)
    }

    /// Move the item at `from` to the insertion point `to` (`0..=len`)
    ///
    /// Moves that leave the order unchanged emit nothing.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(CoreError::out_of_bounds(from, len));
        }
        if to > len {
            return Err(CoreError::out_of_bounds(to, len));
        }

        let landing = if to > from { to - 1 } else { to };
        if landing == from {
            return Ok(());
        }

        let item = self.items.remove(from);
        let location = item.location.clone();
        self.items.insert(landing, item);
        self.record(ListChange::Moved { from, to, location });
        Ok(())
    }

    /// Remove all items
    pub fn clear(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.items.clear();
        self.record(ListChange::Cleared { len });
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut MediaItem> {
        self.items.get_mut(index)
    }

    pub fn location_at(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|item| item.location.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    /// Locations in playback order
    pub fn locations(&self) -> Vec<String> {
        self.items.iter().map(|item| item.location.clone()).collect()
    }

    /// Deterministic identifier derived from the ordered locations
    ///
    /// `None` for an empty list.
    pub fn identifier(&self) -> Option<String> {
        list_identifier(self.items.iter().map(|item| item.location.as_str()))
    }
}

/// Hash an ordered sequence of locations into a hex identifier
///
/// Two sequences with identical contents in identical order hash equally.
/// Locations are NUL-terminated so that `["ab", "c"]` and `["a", "bc"]` differ.
pub fn list_identifier<'a>(locations: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut hasher = Sha256::new();
    let mut any = false;
    for location in locations {
        hasher.update(location.as_bytes());
        hasher.update([0u8]);
        any = true;
    }
    any.then(|| hex::encode_upper(hasher.finalize()))
}
