//! Playlist position tracking
//!
//! Tracks the current index and derives the previous/next indices under the
//! three navigation modes. Precedence is repeat-one, then shuffle, then
//! linear order. Every operation that can invalidate previous/next ends with
//! a `recompute`, so the pair is always consistent with the current index,
//! the modes and the playlist length.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::types::RepeatMode;

/// Shuffling needs more than this many items
const MIN_SHUFFLE_LEN: usize = 2;

/// What happened to the current position when an item was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Current item survived (possibly at a shifted index)
    Kept,

    /// The current item itself was removed
    CurrentRemoved,
}

/// Current/previous/next bookkeeping for one playlist
#[derive(Debug, Clone)]
pub struct NavigationState {
    current: Option<usize>,
    previous: Option<usize>,
    next: Option<usize>,
    repeat: RepeatMode,
    shuffling: bool,

    /// Indices visited since the last shuffle reset, most recent last.
    /// An ordered set: an index appears at most once.
    history: Vec<usize>,

    rng: StdRng,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffle order, for tests and reproducible sessions
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            current: None,
            previous: None,
            next: None,
            repeat: RepeatMode::None,
            shuffling: false,
            history: Vec::new(),
            rng,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn is_shuffling(&self) -> bool {
        self.shuffling
    }

    /// Shuffle history, oldest first
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Forget position, neighbours and history (modes are kept)
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
        self.next = None;
        self.history.clear();
    }

    /// Point at `index` without touching history
    pub fn set_current(&mut self, index: Option<usize>, len: usize) {
        self.current = index;
        self.recompute(len, None);
    }

    /// Restore persisted modes without recomputing
    pub fn restore_modes(&mut self, repeat: RepeatMode, shuffling: bool) {
        self.repeat = repeat;
        self.shuffling = shuffling;
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode, len: usize) {
        self.repeat = repeat;
        self.recompute(len, None);
    }

    /// Flip shuffling; turning it off drops the history
    pub fn toggle_shuffle(&mut self, len: usize) {
        if self.shuffling {
            self.history.clear();
        }
        self.shuffling = !self.shuffling;
        self.recompute(len, None);
    }

    /// Derive previous/next from the current state
    ///
    /// `expanded_next` is set when the current item was just replaced by its
    /// sub-items; the caller passes the index of the first sub-item.
    pub fn recompute(&mut self, len: usize, expanded_next: Option<usize>) {
        self.next = expanded_next;
        self.previous = None;
        if self.next.is_some() {
            return;
        }

        if len <= MIN_SHUFFLE_LEN {
            self.shuffling = false;
        }

        if self.repeat == RepeatMode::One {
            self.previous = self.current;
            self.next = self.current;
        } else if self.shuffling {
            self.recompute_shuffled(len);
        } else {
            self.previous = self.current.filter(|&c| c > 0).map(|c| c - 1);
            let candidate = self.current.map_or(0, |c| c + 1);
            self.next = if candidate < len {
                Some(candidate)
            } else if self.repeat == RepeatMode::All && len > 0 {
                Some(0)
            } else {
                None
            };
        }

        trace!(
            current = ?self.current,
            previous = ?self.previous,
            next = ?self.next,
            len,
            "navigation recomputed"
        );
    }

    fn recompute_shuffled(&mut self, len: usize) {
        self.previous = self.history.last().copied();

        let mut candidates = self.unvisited(len);
        if candidates.is_empty() {
            // Every item has been visited since the last reset
            if self.repeat == RepeatMode::None {
                self.next = None;
                return;
            }
            debug!("shuffle cycle complete, reshuffling");
            self.history.clear();
            self.rng = StdRng::seed_from_u64(self.rng.gen());
            candidates = self.unvisited(len);
        }

        self.next = candidates.choose(&mut self.rng).copied();
    }

    fn unvisited(&self, len: usize) -> Vec<usize> {
        (0..len)
            .filter(|i| Some(*i) != self.current && !self.history.contains(i))
            .collect()
    }

    fn push_history(&mut self, index: usize) {
        self.history.retain(|&i| i != index);
        self.history.push(index);
    }

    /// Step onto the computed next index
    ///
    /// The old current index goes onto the history. Returns the new current
    /// index if it is inside the list; `None` means the caller must stop.
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        if let Some(current) = self.current {
            self.push_history(current);
        }
        self.current = self.next.filter(|&next| next < len);
        self.current
    }

    /// Step back onto the computed previous index
    pub fn retreat(&mut self, len: usize) -> Option<usize> {
        let target = self.previous.filter(|&prev| prev < len)?;
        if self.history.last() == Some(&target) {
            self.history.pop();
        }
        self.current = Some(target);
        Some(target)
    }

    /// Repair after an item was inserted at `index`
    pub fn on_inserted(&mut self, index: usize, len: usize, expanding: bool) {
        if !expanding {
            if let Some(current) = self.current.as_mut() {
                if *current >= index {
                    *current += 1;
                }
            }
            for visited in &mut self.history {
                if *visited >= index {
                    *visited += 1;
                }
            }
        }
        self.recompute(len, None);
    }

    /// Repair after the item at `index` was removed
    pub fn on_removed(&mut self, index: usize, len: usize, expanding: bool) -> Removal {
        if expanding {
            self.recompute(len, None);
            return Removal::Kept;
        }

        self.history.retain(|&i| i != index);
        for visited in &mut self.history {
            if *visited > index {
                *visited -= 1;
            }
        }

        match self.current {
            Some(current) if current == index => {
                self.current = current.checked_sub(1);
                self.recompute(len, None);
                Removal::CurrentRemoved
            }
            Some(current) if current > index => {
                self.current = Some(current - 1);
                self.recompute(len, None);
                Removal::Kept
            }
            _ => {
                self.recompute(len, None);
                Removal::Kept
            }
        }
    }

    /// Repair after an item moved from `from` to the insertion point `to`
    pub fn on_moved(&mut self, from: usize, to: usize, len: usize) {
        if let Some(current) = self.current {
            self.current = Some(if current == from {
                if to > from {
                    to - 1
                } else {
                    to
                }
            } else if from > current && to <= current {
                current + 1
            } else if from < current && to > current {
                current - 1
            } else {
                current
            });
        }

        // Stored indices no longer name the same items
        self.history.clear();
        self.recompute(len, None);
    }

    /// Repair after the whole list was cleared
    pub fn on_cleared(&mut self) {
        self.reset();
        self.recompute(0, None);
    }
}
