//! Random index generator that avoids immediate repeats
//!
//! Keeps the previous draw plus a rolling history of recent draws. A candidate
//! equal to the previous draw is rejected, unless the range has a single
//! value or the candidate is already tracked in the rolling history; the
//! latter relaxation keeps tiny ranges from spinning.

use rand::Rng;
use std::collections::{HashMap, VecDeque};

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Dedup random generator
#[derive(Debug, Clone)]
pub struct DedupRandom {
    /// Last accepted draw
    previous: Option<usize>,

    /// Accepted draws, oldest first
    raw_history: VecDeque<usize>,

    /// Occurrence counts mirroring `raw_history`
    raw_set: HashMap<usize, usize>,

    /// History size that triggers pruning
    capacity: usize,
}

impl DedupRandom {
    /// Create a generator whose rolling history holds `capacity` draws
    pub fn new(capacity: usize) -> Self {
        Self {
            previous: None,
            raw_history: VecDeque::with_capacity(capacity),
            raw_set: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Draw an index in `[0, n)`
    ///
    /// `n <= 1` always yields 0.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R, n: usize) -> usize {
        let next = if n <= 1 {
            0
        } else {
            loop {
                let candidate = rng.gen_range(0..n);
                if Some(candidate) != self.previous || self.contains(candidate) {
                    break candidate;
                }
            }
        };

        self.accept(next);
        next
    }

    /// Whether `value` is in the rolling history
    pub fn contains(&self, value: usize) -> bool {
        self.raw_set.contains_key(&value)
    }

    /// Last accepted draw
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Number of draws currently tracked
    pub fn tracked(&self) -> usize {
        self.raw_history.len()
    }

    fn accept(&mut self, value: usize) {
        self.previous = Some(value);
        self.raw_history.push_back(value);
        *self.raw_set.entry(value).or_insert(0) += 1;

        if self.raw_history.len() >= self.capacity {
            // Evict the oldest half, not just one entry
            let evict = (self.capacity / 2).max(1);
            for _ in 0..evict {
                let Some(old) = self.raw_history.pop_front() else {
                    break;
                };
                if let Some(count) = self.raw_set.get_mut(&old) {
                    *count -= 1;
                    if *count == 0 {
                        self.raw_set.remove(&old);
                    }
                }
            }
        }
    }
}

impl Default for DedupRandom {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn single_value_range_returns_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dedup = DedupRandom::default();

        assert_eq!(dedup.draw(&mut rng, 1), 0);
        assert_eq!(dedup.draw(&mut rng, 1), 0);
        assert_eq!(dedup.draw(&mut rng, 0), 0);
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut dedup = DedupRandom::default();

        for _ in 0..1000 {
            assert!(dedup.draw(&mut rng, 13) < 13);
        }
    }

    #[test]
    fn history_prunes_oldest_half() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut dedup = DedupRandom::new(100);

        for _ in 0..99 {
            dedup.draw(&mut rng, 1000);
        }
        assert_eq!(dedup.tracked(), 99);

        // The hundredth draw reaches capacity and evicts fifty
        dedup.draw(&mut rng, 1000);
        assert_eq!(dedup.tracked(), 50);
    }

    #[test]
    fn set_mirrors_history() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut dedup = DedupRandom::new(10);

        for _ in 0..57 {
            dedup.draw(&mut rng, 4);
            let distinct: std::collections::HashSet<_> =
                dedup.raw_history.iter().copied().collect();
            assert_eq!(distinct.len(), dedup.raw_set.len());
            assert_eq!(
                dedup.raw_set.values().sum::<usize>(),
                dedup.raw_history.len()
            );
        }
    }

    #[test]
    fn repeats_only_when_already_tracked() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut dedup = DedupRandom::default();

        let mut last = dedup.draw(&mut rng, 3);
        for _ in 0..500 {
            let tracked_before = dedup.contains(last);
            let next = dedup.draw(&mut rng, 3);
            if next == last {
                assert!(tracked_before);
            }
            last = next;
        }
    }
}
