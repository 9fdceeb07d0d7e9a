//! Core types for playback control

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a playable item
///
/// Carries no metadata; the track catalog resolves it on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackRef(pub u64);

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TrackRef {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Track information resolved from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Track duration in milliseconds
    pub duration_ms: u64,

    /// Whether the track is marked as a favorite
    #[serde(default)]
    pub is_favorite: bool,
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No initialized data source, or playback stopped
    #[default]
    Idle,

    /// Currently playing
    Playing,

    /// Paused by the user
    Paused,

    /// Paused because another application took audio focus for a while
    PausedByFocusLoss,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    None,

    /// Loop current track only
    Current,

    /// Loop entire queue
    All,
}

/// Shuffle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Play the queue in order
    #[default]
    None,

    /// Walk the queue through a shuffle bag
    Normal,

    /// Party shuffle: keep extending the queue from the whole library
    Auto,
}

/// Where enqueued tracks go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Append and start playing the first new track
    Now,

    /// Insert right after the current track
    Next,

    /// Append at the tail
    Last,
}

/// Audio focus notifications from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    /// Focus (re)gained
    Gain,

    /// Focus lost for an unknown amount of time
    Loss,

    /// Focus lost briefly; playback may resume on regain
    LossTransient,

    /// Focus lost briefly; playback may continue at reduced volume
    LossTransientCanDuck,
}

/// Effect of a queue mutation on the current position
///
/// Queue mutations never move the cursor themselves; the controller applies
/// the returned delta and reacts to it.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDelta {
    /// Current position still points at the same entry
    Unchanged,

    /// Current entry moved by this many slots
    Shifted(isize),

    /// Current entry was removed; position falls back to this index
    Collapsed(usize),
}
