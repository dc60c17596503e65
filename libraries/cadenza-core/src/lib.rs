//! Cadenza - Core Types
//!
//! Leaf data model shared by the playback crates:
//! - `MediaItem`: one playable entry, identified by its location (MRL)
//! - `Playlist`: ordered list with strict index checks and change events
//! - Location helpers (validation, locality, list identifiers)
//!
//! # Example
//!
//! ```rust
//! use cadenza_core::{ListChange, MediaItem, Playlist};
//!
//! let mut list = Playlist::new();
//! list.set_observed(true);
//! list.add(MediaItem::new("https://example.com/chapter1.mp3"));
//! list.add(MediaItem::new("https://example.com/chapter2.mp3"));
//! list.move_item(1, 0).unwrap();
//!
//! assert_eq!(list.location_at(0), Some("https://example.com/chapter2.mp3"));
//! assert_eq!(list.drain_changes().len(), 3);
//! assert!(list.identifier().is_some());
//! ```

mod error;
pub mod media;
pub mod playlist;

pub use error::{CoreError, Result};
pub use media::{is_local_location, validate_location, MediaItem, MediaKind, MediaMeta, MetaField};
pub use playlist::{list_identifier, ListChange, Playlist};
