//! Media items
//!
//! A `MediaItem` describes one playable entry of a playlist. Identity is the
//! location (an MRL such as `file:///music/a.mp3` or `https://radio/stream`);
//! everything else is display metadata that the engine may fill in later.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{CoreError, Result};

/// Kind of media (video is representable but never rendered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

/// Metadata field reported by the engine in a meta-changed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaField {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Genre,
    Description,
    TrackNumber,
    ArtworkUrl,
    NowPlaying,
    Publisher,
    Other,
}

/// Metadata snapshot read back from the engine for the playing item
///
/// `None` fields leave the item's current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMeta {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub artwork_url: Option<String>,
    pub now_playing: Option<String>,
    pub track_number: Option<u32>,
    pub duration: Option<Duration>,
}

/// One playable playlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Media resource locator, the item's identity
    pub location: String,

    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,

    /// Artwork reference (URL or path), fetched by the host
    pub artwork_url: Option<String>,

    /// Stream "now playing" text, overrides the title for display
    pub now_playing: Option<String>,

    pub duration: Duration,
    pub track_number: Option<u32>,
    pub kind: MediaKind,

    /// Engine has finished parsing this item's metadata
    pub parsed: bool,

    /// Host has loaded the artwork picture
    pub artwork_loaded: bool,
}

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";
const UNKNOWN_GENRE: &str = "Unknown Genre";

impl MediaItem {
    /// Create an audio item with no metadata yet
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            title: None,
            artist: None,
            album: None,
            album_artist: None,
            genre: None,
            description: None,
            artwork_url: None,
            now_playing: None,
            duration: Duration::ZERO,
            track_number: None,
            kind: MediaKind::Audio,
            parsed: false,
            artwork_loaded: false,
        }
    }

    /// Builder-style title setter
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder-style artist setter
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Builder-style kind setter
    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Title for display, falling back to the file name of the location
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => file_name(&self.location).to_string(),
        }
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or(UNKNOWN_ARTIST)
    }

    pub fn display_album(&self) -> &str {
        self.album.as_deref().unwrap_or(UNKNOWN_ALBUM)
    }

    pub fn display_genre(&self) -> &str {
        self.genre.as_deref().unwrap_or(UNKNOWN_GENRE)
    }

    /// Subtitle line: now-playing text for streams, else "artist - album"
    pub fn display_subtitle(&self) -> String {
        match (&self.now_playing, self.kind) {
            (_, MediaKind::Video) => String::new(),
            (Some(now_playing), MediaKind::Audio) => now_playing.clone(),
            (None, MediaKind::Audio) => {
                format!("{} - {}", self.display_artist(), self.display_album())
            }
        }
    }

    /// Whether the item is read from local storage rather than the network
    pub fn is_local(&self) -> bool {
        is_local_location(&self.location)
    }

    /// Merge an engine metadata snapshot into this item
    pub fn apply_meta(&mut self, meta: &MediaMeta) {
        fn merge(slot: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        merge(&mut self.title, &meta.title);
        merge(&mut self.artist, &meta.artist);
        merge(&mut self.album, &meta.album);
        merge(&mut self.album_artist, &meta.album_artist);
        merge(&mut self.genre, &meta.genre);
        merge(&mut self.description, &meta.description);
        merge(&mut self.now_playing, &meta.now_playing);
        if meta.artwork_url.is_some() && meta.artwork_url != self.artwork_url {
            self.artwork_url.clone_from(&meta.artwork_url);
            self.artwork_loaded = false;
        }
        if let Some(track) = meta.track_number {
            self.track_number = Some(track);
        }
        if let Some(duration) = meta.duration {
            self.duration = duration;
        }
    }

    /// Reset the per-playback transient flags before handing to the engine
    pub fn reset_transient(&mut self) {
        self.parsed = false;
    }
}

/// Last path segment of a location
pub fn file_name(location: &str) -> &str {
    match location.rfind('/') {
        Some(index) => &location[index + 1..],
        None => location,
    }
}

/// Whether the location has an explicit `scheme://` prefix
fn has_scheme(location: &str) -> bool {
    match location.find("://") {
        Some(0) | None => false,
        Some(end) => {
            location[..end]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && location.len() > end + 3
        }
    }
}

/// Whether a location refers to local storage
///
/// Scheme-less locations are plain paths and count as local.
pub fn is_local_location(location: &str) -> bool {
    !has_scheme(location) || location.to_ascii_lowercase().starts_with("file://")
}

/// Normalize a location into an MRL and check that file locations exist
///
/// Scheme-less strings are taken as filesystem paths and prefixed with
/// `file://`. Network locations are accepted without probing.
pub fn validate_location(location: &str) -> Result<String> {
    let mrl = if has_scheme(location) {
        location.to_string()
    } else {
        format!("file://{location}")
    };

    if !mrl.to_ascii_lowercase().starts_with("file://") {
        return Ok(mrl);
    }

    let url = Url::parse(&mrl).map_err(|_| CoreError::InvalidLocation(location.to_string()))?;
    let path = url
        .to_file_path()
        .map_err(|()| CoreError::InvalidLocation(location.to_string()))?;

    if is_file(&path) {
        Ok(mrl)
    } else {
        debug!(location, "media location is not a file");
        Err(CoreError::InvalidLocation(location.to_string()))
    }
}

fn is_file(path: &Path) -> bool {
    path.is_file()
}
