//! Change notifications emitted by the controller

use serde::{Deserialize, Serialize};

use crate::types::{PlaybackState, RepeatMode, ShuffleMode, TrackRef};

/// One discrete change announced to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Queue contents changed
    QueueChanged,

    /// Active track changed
    TrackChanged { track: Option<TrackRef> },

    /// Playback state changed
    PlaybackStateChanged { state: PlaybackState },

    /// Position inside the track changed (seek)
    PositionChanged { position_ms: u64 },

    /// Repeat mode changed
    RepeatModeChanged(RepeatMode),

    /// Shuffle mode changed
    ShuffleModeChanged(ShuffleMode),
}

/// How much state an event causes to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Persistence {
    /// Nothing
    None,

    /// Cursor, seek position and modes
    Cursor,

    /// Queue and history as well
    Full,
}

impl ControllerEvent {
    /// Persistence triggered by this event
    pub fn persistence(&self) -> Persistence {
        match self {
            ControllerEvent::PositionChanged { .. } => Persistence::None,
            ControllerEvent::QueueChanged => Persistence::Full,
            _ => Persistence::Cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ticks_are_not_persisted() {
        let event = ControllerEvent::PositionChanged { position_ms: 10 };
        assert_eq!(event.persistence(), Persistence::None);
    }

    #[test]
    fn queue_changes_write_everything() {
        assert_eq!(ControllerEvent::QueueChanged.persistence(), Persistence::Full);
        assert_eq!(
            ControllerEvent::RepeatModeChanged(RepeatMode::All).persistence(),
            Persistence::Cursor
        );
        assert!(Persistence::Full > Persistence::Cursor);
    }
}
