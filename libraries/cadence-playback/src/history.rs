//! Bounded history of integers
//!
//! Backs both the "recently visited queue positions" stack used by
//! previous-track navigation and the "recently drawn pool indices" stack used
//! by party shuffle to avoid near-term repeats.

use std::collections::VecDeque;

/// Default history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// History with bounded size
///
/// Implements a ring buffer that automatically discards oldest entries.
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    /// History buffer (most recent = back)
    entries: VecDeque<usize>,

    /// Maximum history size
    capacity: usize,
}

impl BoundedHistory {
    /// Create new history with specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a history from persisted entries (oldest first)
    ///
    /// Keeps only the newest `capacity` entries.
    pub fn from_entries(entries: &[usize], capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for &entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append an entry, discarding the oldest when full
    pub fn push(&mut self, entry: usize) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove and return the most recent entry
    pub fn pop_last(&mut self) -> Option<usize> {
        self.entries.pop_back()
    }

    /// Check whether `entry` appears among the last `window` entries
    ///
    /// The window is clamped to the current length; a zero window never
    /// matches.
    pub fn recent_contains(&self, entry: usize, window: usize) -> bool {
        self.entries
            .iter()
            .rev()
            .take(window.min(self.entries.len()))
            .any(|&e| e == entry)
    }

    /// Rewrite every entry, dropping the ones the mapping rejects
    ///
    /// Used to keep queue positions valid after the queue is edited.
    pub fn retain_map<F>(&mut self, mut map: F)
    where
        F: FnMut(usize) -> Option<usize>,
    {
        self.entries = self.entries.iter().filter_map(|&e| map(e)).collect();
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }

    /// Entries as a vector, oldest first
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Maximum number of entries kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_history() {
        let history = BoundedHistory::new(10);
        assert_eq!(history.capacity(), 10);
        assert_eq!(history.len(), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn pop_from_history() {
        let mut history = BoundedHistory::new(10);
        history.push(1);
        history.push(2);
        history.push(3);

        assert_eq!(history.pop_last(), Some(3));
        assert_eq!(history.pop_last(), Some(2));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_keeps_newest_hundred() {
        let mut history = BoundedHistory::default();
        for i in 0..150 {
            history.push(i);
        }

        assert_eq!(history.len(), 100);
        assert_eq!(history.to_vec(), (50..150).collect::<Vec<_>>());
    }

    #[test]
    fn recent_contains_respects_window() {
        let mut history = BoundedHistory::new(10);
        for i in [5, 6, 7, 8] {
            history.push(i);
        }

        assert!(history.recent_contains(8, 1));
        assert!(!history.recent_contains(7, 1));
        assert!(history.recent_contains(5, 4));
        // Window larger than the history is clamped
        assert!(history.recent_contains(5, 40));
        assert!(!history.recent_contains(9, 40));
    }

    #[test]
    fn zero_window_never_matches() {
        let mut history = BoundedHistory::new(10);
        history.push(3);
        assert!(!history.recent_contains(3, 0));
    }

    #[test]
    fn retain_map_drops_and_shifts() {
        let mut history = BoundedHistory::from_entries(&[0, 3, 5, 8], 10);

        // Simulate removing queue entries 2..=4
        history.retain_map(|p| match p {
            2..=4 => None,
            p if p > 4 => Some(p - 3),
            p => Some(p),
        });

        assert_eq!(history.to_vec(), vec![0, 2, 5]);
    }

    #[test]
    fn from_entries_trims_to_capacity() {
        let history = BoundedHistory::from_entries(&[1, 2, 3, 4, 5], 3);
        assert_eq!(history.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut history = BoundedHistory::new(0);
        history.push(1);
        assert!(history.is_empty());
    }
}
