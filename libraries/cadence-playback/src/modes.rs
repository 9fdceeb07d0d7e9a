//! Shuffle and repeat mode combinations
//!
//! Every `(shuffle, repeat, forced)` triple maps to exactly one
//! [`Transition`], which the shuffle engine then executes.

use serde::{Deserialize, Serialize};

use crate::types::{RepeatMode, ShuffleMode};

/// Current shuffle and repeat settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modes {
    /// Shuffle mode
    pub shuffle: ShuffleMode,

    /// Repeat mode
    pub repeat: RepeatMode,
}

/// How to pick the next queue position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stay on the current entry
    Stay,

    /// Step forward through the queue
    Linear {
        /// Wrap to the head after the last entry instead of ending
        wrap: bool,
    },

    /// Draw from the shuffle bag
    Bag {
        /// Record the position being left for "previous"
        record: bool,
    },

    /// Extend the queue from the library pool and step forward
    Party,
}

impl Modes {
    /// Create a mode pair
    pub fn new(shuffle: ShuffleMode, repeat: RepeatMode) -> Self {
        Self { shuffle, repeat }
    }

    /// Transition for a next-track request
    ///
    /// `forced` is true for user skips and false for natural advances
    /// (end of track, prefetch).
    pub fn transition(self, forced: bool) -> Transition {
        match (self.shuffle, self.repeat, forced) {
            (_, RepeatMode::Current, false) => Transition::Stay,
            (ShuffleMode::None, RepeatMode::None, false) => Transition::Linear { wrap: false },
            (ShuffleMode::None, RepeatMode::All, _) | (ShuffleMode::None, _, true) => {
                Transition::Linear { wrap: true }
            }
            (ShuffleMode::Normal, RepeatMode::None | RepeatMode::All, false) => {
                Transition::Bag { record: false }
            }
            (ShuffleMode::Normal, _, true) => Transition::Bag { record: true },
            (ShuffleMode::Auto, _, _) => Transition::Party,
        }
    }

    /// Next repeat mode in the None → All → Current cycle
    ///
    /// Entering Repeat-Current turns shuffle off.
    pub fn cycle_repeat(self) -> Self {
        match self.repeat {
            RepeatMode::None => Self::new(self.shuffle, RepeatMode::All),
            RepeatMode::All => Self::new(ShuffleMode::None, RepeatMode::Current),
            RepeatMode::Current => Self::new(self.shuffle, RepeatMode::None),
        }
    }

    /// Toggle between no shuffle and the shuffle bag
    ///
    /// Turning shuffle on while repeating the current track switches to
    /// repeating the whole queue. Any shuffle mode, party shuffle included,
    /// toggles off.
    pub fn toggle_shuffle(self) -> Self {
        match self.shuffle {
            ShuffleMode::None => {
                let repeat = match self.repeat {
                    RepeatMode::Current => RepeatMode::All,
                    other => other,
                };
                Self::new(ShuffleMode::Normal, repeat)
            }
            ShuffleMode::Normal | ShuffleMode::Auto => Self::new(ShuffleMode::None, self.repeat),
        }
    }
}
