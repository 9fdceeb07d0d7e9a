//! Shuffle engine
//!
//! Implements the two shuffle algorithms plus linear stepping:
//! - Shuffle bag (Normal): walks a permutation of the queue so every entry
//!   plays once per cycle
//! - Party shuffle (Auto): keeps a short lookahead of tracks drawn from the
//!   whole library, avoiding recently drawn ones
//!
//! Two separate histories are kept. `played` holds queue positions for
//! "previous" navigation in Normal mode; `drawn` holds library pool indices
//! for repeat avoidance in Auto mode.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::{PlaybackError, Result};
use crate::history::BoundedHistory;
use crate::modes::{Modes, Transition};
use crate::queue::{moved_index, Queue};
use crate::random::DedupRandom;
use crate::types::TrackRef;

/// Outcome of a next-position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep {
    /// Position to play next, `None` at the end of the queue
    pub position: Option<usize>,

    /// Whether the request edited the queue (party shuffle only)
    pub queue_changed: bool,
}

impl NextStep {
    fn at(position: Option<usize>) -> Self {
        Self {
            position,
            queue_changed: false,
        }
    }
}

/// Shuffle state owned by the controller
#[derive(Debug, Clone)]
pub struct ShuffleEngine {
    /// Queue positions left by forced skips (Normal mode)
    played: BoundedHistory,

    /// Pool indices drawn by party shuffle (Auto mode)
    drawn: BoundedHistory,

    /// Permutation of queue indices
    bag: Vec<usize>,

    /// Next slot of `bag` to hand out
    bag_cursor: usize,

    /// Library snapshot party shuffle draws from
    pool: Vec<TrackRef>,

    dedup: DedupRandom,
    rng: StdRng,

    lookahead: usize,
    trim_threshold: usize,
    keep_behind: usize,
}

impl ShuffleEngine {
    /// Create a shuffle engine from controller settings
    pub fn new(config: &ControllerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            played: BoundedHistory::new(config.history_capacity),
            drawn: BoundedHistory::new(config.history_capacity),
            bag: Vec::new(),
            bag_cursor: 0,
            pool: Vec::new(),
            dedup: DedupRandom::new(config.history_capacity),
            rng,
            lookahead: config.auto_lookahead,
            trim_threshold: config.auto_trim_threshold,
            keep_behind: config.auto_keep_behind,
        }
    }

    /// Pick the position after the current one
    ///
    /// Party shuffle may trim the queue head and append new tracks; the
    /// queue cursor is kept consistent and `queue_changed` reports the edit.
    pub fn next_position(
        &mut self,
        queue: &mut Queue,
        modes: Modes,
        forced: bool,
    ) -> Result<NextStep> {
        match modes.transition(forced) {
            Transition::Stay => {
                let position = if queue.is_empty() {
                    None
                } else {
                    Some(queue.position().unwrap_or(0))
                };
                Ok(NextStep::at(position))
            }
            Transition::Linear { wrap } => Ok(NextStep::at(linear_next(queue, wrap))),
            Transition::Bag { record } => {
                if record {
                    if let Some(left) = queue.position() {
                        self.played.push(left);
                    }
                }
                self.bag_next(queue.len()).map(|p| NextStep::at(Some(p)))
            }
            Transition::Party => self.party_next(queue),
        }
    }

    /// Next entry of the shuffle bag, regenerating it when stale
    fn bag_next(&mut self, len: usize) -> Result<usize> {
        if self.bag.len() != len || self.bag_cursor >= self.bag.len() {
            if len == 0 {
                return Err(PlaybackError::ShuffleUnavailable("queue is empty"));
            }
            self.bag = (0..len).collect();
            self.bag.shuffle(&mut self.rng);
            self.bag_cursor = 0;
            debug!(len, "Regenerated shuffle bag");
        }

        let position = self.bag[self.bag_cursor];
        self.bag_cursor += 1;
        Ok(position)
    }

    /// Party shuffle: trim played tracks, top up the lookahead, step forward
    fn party_next(&mut self, queue: &mut Queue) -> Result<NextStep> {
        let mut queue_changed = false;

        if let Some(position) = queue.position() {
            if position > self.trim_threshold && position > self.keep_behind {
                let removal = queue.remove_range(0, position - self.keep_behind - 1);
                let removed = removal.count();
                queue.apply(removal.delta);
                self.forget_removed(0, removed);
                queue_changed = true;
                debug!(removed, "Trimmed party shuffle history from queue head");
            }
        }

        let current = queue.position().map_or(-1, |p| p as isize);
        let to_add = self.lookahead as isize - (queue.len() as isize - current);
        if to_add > 0 && self.pool.is_empty() {
            return Err(PlaybackError::ShuffleUnavailable("library pool is empty"));
        }

        for _ in 0..to_add.max(0) {
            let index = self.draw_pool_index();
            self.drawn.push(index);
            queue.push(self.pool[index]);
            queue_changed = true;
        }

        Ok(NextStep {
            position: Some((current + 1) as usize),
            queue_changed,
        })
    }

    /// Draw a pool index not used recently
    ///
    /// Each rejected draw halves the lookback, so a small pool settles
    /// instead of spinning.
    fn draw_pool_index(&mut self) -> usize {
        let mut lookback = self.drawn.len();
        loop {
            let index = self.dedup.draw(&mut self.rng, self.pool.len());
            if !self.drawn.recent_contains(index, lookback) {
                return index;
            }
            lookback /= 2;
        }
    }

    /// Random queue index for opening a list without a start position
    pub fn random_index(&mut self, len: usize) -> usize {
        self.dedup.draw(&mut self.rng, len)
    }

    // ===== Party pool =====

    /// Replace the library snapshot used by party shuffle
    pub fn set_pool(&mut self, pool: Vec<TrackRef>) {
        self.pool = pool;
    }

    /// Library snapshot used by party shuffle
    pub fn pool(&self) -> &[TrackRef] {
        &self.pool
    }

    // ===== Histories =====

    /// Record a queue position for "previous"
    pub fn record_played(&mut self, position: usize) {
        self.played.push(position);
    }

    /// Take the most recent played position that is still inside the queue
    pub fn pop_played(&mut self, queue_len: usize) -> Option<usize> {
        while let Some(position) = self.played.pop_last() {
            if position < queue_len {
                return Some(position);
            }
        }
        None
    }

    /// Played positions, oldest first
    pub fn played(&self) -> &BoundedHistory {
        &self.played
    }

    /// Drawn pool indices, oldest first
    pub fn drawn(&self) -> &BoundedHistory {
        &self.drawn
    }

    /// Restore played positions from saved state
    pub fn restore_played(&mut self, positions: &[usize]) {
        self.played = BoundedHistory::from_entries(positions, self.played.capacity());
    }

    /// Forget both histories and the bag
    ///
    /// Called on every shuffle mode switch so the two histories never mix.
    pub fn reset(&mut self) {
        self.played.clear();
        self.drawn.clear();
        self.reset_bag();
    }

    /// Drop played positions after the queue was replaced
    pub fn clear_played(&mut self) {
        self.played.clear();
    }

    /// Force the bag to regenerate on the next draw
    pub fn reset_bag(&mut self) {
        self.bag.clear();
        self.bag_cursor = 0;
    }

    /// Remap played positions after `count` entries were removed at `first`
    pub fn forget_removed(&mut self, first: usize, count: usize) {
        if count == 0 {
            return;
        }
        let last = first + count - 1;
        self.played.retain_map(|p| match p {
            p if p < first => Some(p),
            p if p > last => Some(p - count),
            _ => None,
        });
    }

    /// Remap played positions after an entry moved
    pub fn follow_move(&mut self, from: usize, to: usize) {
        self.played.retain_map(|p| Some(moved_index(p, from, to)));
    }
}

/// Step forward through the queue
fn linear_next(queue: &Queue, wrap: bool) -> Option<usize> {
    if queue.is_empty() {
        return None;
    }
    match queue.position() {
        None => Some(0),
        Some(p) if p + 1 >= queue.len() => wrap.then_some(0),
        Some(p) => Some(p + 1),
    }
}
