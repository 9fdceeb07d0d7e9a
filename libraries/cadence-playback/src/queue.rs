//! Play queue
//!
//! Ordered list of track references (duplicates allowed) with a current
//! cursor and a cached "next" cursor for gapless prefetch:
//!
//! ```text
//! index:     0     1     2     3     4
//! tracks:  [ 10 ][ 20 ][ 30 ][ 20 ][ 40 ]
//!                       ^           ^
//!                    position   next_position
//! ```
//!
//! Edits never move the cursor on their own. They return a
//! [`PositionDelta`] which the controller applies with [`Queue::apply`].

use std::ops::{Range, RangeInclusive};

use crate::types::{Placement, PositionDelta, TrackRef};

/// Result of a range removal
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Indices that were removed, after clamping
    pub range: RangeInclusive<usize>,

    /// Effect on the current position
    pub delta: PositionDelta,
}

impl Removal {
    /// Number of removed entries
    pub fn count(&self) -> usize {
        if self.range.is_empty() {
            0
        } else {
            self.range.end() - self.range.start() + 1
        }
    }

    #[allow(clippy::reversed_empty_ranges)]
    fn nothing() -> Self {
        Self {
            range: 1..=0,
            delta: PositionDelta::Unchanged,
        }
    }
}

/// Play queue with current and next cursors
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Tracks in play order
    tracks: Vec<TrackRef>,

    /// Index of the active entry
    position: Option<usize>,

    /// Index of the prefetched entry
    next_position: Option<usize>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from tracks with an initial position
    ///
    /// A position outside the queue is dropped.
    pub fn with_tracks(tracks: Vec<TrackRef>, position: Option<usize>) -> Self {
        let position = position.filter(|&p| p < tracks.len());
        Self {
            tracks,
            position,
            next_position: None,
        }
    }

    // ===== Cursors =====

    /// Index of the active entry
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Move the cursor
    ///
    /// Positions outside the queue clear the cursor.
    pub fn set_position(&mut self, position: Option<usize>) {
        self.position = position.filter(|&p| p < self.tracks.len());
    }

    /// Index of the prefetched entry
    pub fn next_position(&self) -> Option<usize> {
        self.next_position
    }

    /// Cache the prefetched entry
    pub fn set_next_position(&mut self, position: Option<usize>) {
        self.next_position = position.filter(|&p| p < self.tracks.len());
    }

    /// Active track
    pub fn current(&self) -> Option<TrackRef> {
        self.position.and_then(|p| self.tracks.get(p).copied())
    }

    /// Prefetched track
    pub fn next_track(&self) -> Option<TrackRef> {
        self.next_position.and_then(|p| self.tracks.get(p).copied())
    }

    /// Apply the effect of an edit to the cursor
    pub fn apply(&mut self, delta: PositionDelta) {
        let position = match (delta, self.position) {
            (PositionDelta::Unchanged, position) => position,
            (PositionDelta::Shifted(by), Some(p)) => p.checked_add_signed(by),
            (PositionDelta::Shifted(_), None) => None,
            (PositionDelta::Collapsed(first), _) => Some(first),
        };
        self.set_position(position);
    }

    // ===== Edits =====

    /// Remove entries `first..=last`
    ///
    /// Bounds are clamped to the queue; an inverted range removes nothing.
    pub fn remove_range(&mut self, first: usize, last: usize) -> Removal {
        if self.tracks.is_empty() || last < first || first >= self.tracks.len() {
            return Removal::nothing();
        }
        let last = last.min(self.tracks.len() - 1);
        let count = last - first + 1;

        let delta = match self.position {
            Some(p) if (first..=last).contains(&p) => PositionDelta::Collapsed(first),
            Some(p) if p > last => PositionDelta::Shifted(-(count as isize)),
            _ => PositionDelta::Unchanged,
        };

        self.tracks.drain(first..=last);
        self.next_position = None;

        Removal {
            range: first..=last,
            delta,
        }
    }

    /// Move one entry from `from` to `to`
    ///
    /// Indices beyond the tail are clamped to the last entry.
    pub fn move_item(&mut self, from: usize, to: usize) -> PositionDelta {
        if self.tracks.is_empty() {
            return PositionDelta::Unchanged;
        }
        let last = self.tracks.len() - 1;
        let (from, to) = (from.min(last), to.min(last));
        if from == to {
            return PositionDelta::Unchanged;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        self.next_position = None;

        match self.position {
            Some(p) => PositionDelta::Shifted(moved_index(p, from, to) as isize - p as isize),
            None => PositionDelta::Unchanged,
        }
    }

    /// Insert tracks according to `placement`
    ///
    /// Returns the indices of the inserted entries. `Next` only inserts after
    /// the current entry when one follows it; otherwise it appends.
    pub fn enqueue(&mut self, tracks: &[TrackRef], placement: Placement) -> Range<usize> {
        let at = match (placement, self.position) {
            (Placement::Next, Some(p)) if p + 1 < self.tracks.len() => p + 1,
            _ => self.tracks.len(),
        };

        self.tracks.splice(at..at, tracks.iter().copied());
        self.next_position = None;
        at..at + tracks.len()
    }

    /// Append one track at the tail
    pub fn push(&mut self, track: TrackRef) {
        self.tracks.push(track);
    }

    /// Replace the whole queue
    ///
    /// Returns `false` (and leaves the queue untouched) when `tracks` equals
    /// the current contents element by element. A replacement clears both
    /// cursors.
    pub fn replace_all(&mut self, tracks: &[TrackRef]) -> bool {
        if self.tracks == tracks {
            return false;
        }
        self.tracks = tracks.to_vec();
        self.position = None;
        self.next_position = None;
        true
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.position = None;
        self.next_position = None;
    }

    // ===== Queries =====

    /// All tracks in play order
    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    /// Track at index
    pub fn get(&self, index: usize) -> Option<TrackRef> {
        self.tracks.get(index).copied()
    }

    /// Indices holding `track`
    pub fn indices_of(&self, track: TrackRef) -> Vec<usize> {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| (t == track).then_some(i))
            .collect()
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Where the entry at `index` ends up after moving `from` to `to`
pub fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}
