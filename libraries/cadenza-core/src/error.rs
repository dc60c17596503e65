/// Core error types for Cadenza
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by direct playlist mutation and location handling
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Index outside `[0, len)` (or `[0, len]` for inserts)
    #[error("Index out of bounds: {index} (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// No item in the playlist has this location
    #[error("Location not in playlist: {0}")]
    LocationNotFound(String),

    /// Location could not be parsed or does not point at a playable file
    #[error("Invalid media location: {0}")]
    InvalidLocation(String),
}

impl CoreError {
    pub(crate) fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }
}
