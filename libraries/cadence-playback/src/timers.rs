//! Delayed, cancelable controller messages
//!
//! At most one timer per kind is pending; scheduling a kind again replaces
//! the pending one. The playback worker sleeps until [`Timers::next_deadline`]
//! and hands due kinds back to the controller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Kinds of delayed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next volume step up
    FadeIn,

    /// Next volume step down while ducking
    FadeDown,

    /// Release the engine after a stretch without playback
    IdleShutdown,
}

/// Pending timers keyed by kind
#[derive(Debug, Clone, Default)]
pub struct Timers {
    pending: HashMap<TimerKind, Instant>,
}

impl Timers {
    /// Create with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `kind` after `delay`, superseding a pending one
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.schedule_at(kind, Instant::now() + delay);
    }

    /// Fire `kind` at `deadline`, superseding a pending one
    pub fn schedule_at(&mut self, kind: TimerKind, deadline: Instant) {
        self.pending.insert(kind, deadline);
    }

    /// Drop a pending timer
    pub fn cancel(&mut self, kind: TimerKind) {
        self.pending.remove(&kind);
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every kind due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = self
            .pending
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&kind, &deadline)| (deadline, kind))
            .collect();
        due.sort_by_key(|&(deadline, _)| deadline);

        for (_, kind) in &due {
            self.pending.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_again_supersedes() {
        let mut timers = Timers::new();
        let now = Instant::now();

        timers.schedule_at(TimerKind::IdleShutdown, now + Duration::from_secs(1));
        timers.schedule_at(TimerKind::IdleShutdown, now + Duration::from_secs(60));

        assert!(timers.take_due(now + Duration::from_secs(2)).is_empty());
        assert_eq!(
            timers.next_deadline(),
            Some(now + Duration::from_secs(60))
        );
    }

    #[test]
    fn cancel_removes_pending() {
        let mut timers = Timers::new();
        timers.schedule(TimerKind::FadeIn, Duration::from_millis(10));
        assert!(timers.is_pending(TimerKind::FadeIn));

        timers.cancel(TimerKind::FadeIn);
        assert!(!timers.is_pending(TimerKind::FadeIn));
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn take_due_orders_by_deadline() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.schedule_at(TimerKind::IdleShutdown, now + Duration::from_millis(5));
        timers.schedule_at(TimerKind::FadeIn, now + Duration::from_millis(1));
        timers.schedule_at(TimerKind::FadeDown, now + Duration::from_secs(10));

        let due = timers.take_due(now + Duration::from_millis(5));
        assert_eq!(due, vec![TimerKind::FadeIn, TimerKind::IdleShutdown]);
        assert!(timers.is_pending(TimerKind::FadeDown));
    }
}
