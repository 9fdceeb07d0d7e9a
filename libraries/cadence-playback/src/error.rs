//! Error types for playback control

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Shuffle order could not be built (empty queue or empty pool)
    #[error("Shuffle unavailable: {0}")]
    ShuffleUnavailable(&'static str),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// The playback worker is no longer running
    #[error("Playback worker stopped")]
    WorkerStopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Track catalog errors
///
/// The controller never propagates these: a failed lookup is treated as
/// "no data" for that track.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Track is not known to the catalog
    #[error("Track not found: {0}")]
    NotFound(u64),

    /// Catalog could not be queried
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Library file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings store errors
///
/// Persistence is best-effort; the controller logs and drops these.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Saved state could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
