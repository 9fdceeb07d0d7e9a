//! Playback controller - core orchestration
//!
//! Owns the queue, the shuffle engine and the mode pair, drives the
//! platform engine, and announces every change as a [`ControllerEvent`].
//! No method blocks or returns an error: failures degrade to a no-op, a
//! rollback, or a transition to idle.
//!
//! The controller is single-threaded. [`crate::PlaybackService`] wraps it in
//! a worker thread that applies commands in arrival order and fires timers.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::catalog::TrackCatalog;
use crate::config::ControllerConfig;
use crate::engine::{AudioFocus, EngineEvent, PlaybackEngine};
use crate::error::SettingsError;
use crate::events::{ControllerEvent, Persistence};
use crate::modes::Modes;
use crate::queue::Queue;
use crate::settings::{SavedState, SettingsStore};
use crate::shuffle::ShuffleEngine;
use crate::timers::{TimerKind, Timers};
use crate::types::{
    FocusChange, Placement, PlaybackState, PositionDelta, RepeatMode, ShuffleMode, TrackMetadata,
    TrackRef,
};

/// External systems the controller talks to
pub struct Collaborators {
    /// Library lookup
    pub catalog: Box<dyn TrackCatalog>,

    /// Audio output
    pub engine: Box<dyn PlaybackEngine>,

    /// Focus arbiter
    pub focus: Box<dyn AudioFocus>,

    /// State persistence
    pub settings: Box<dyn SettingsStore>,
}

/// Queue and shuffle playback controller
pub struct PlaybackController {
    config: ControllerConfig,

    catalog: Box<dyn TrackCatalog>,
    engine: Box<dyn PlaybackEngine>,
    focus: Box<dyn AudioFocus>,
    settings: Box<dyn SettingsStore>,

    queue: Queue,
    shuffle: ShuffleEngine,
    modes: Modes,
    state: PlaybackState,

    /// Volume last handed to the engine
    volume: f32,

    /// Where to resume after the engine was released while idle
    resume_position_ms: Option<u64>,

    timers: Timers,

    /// Events not yet collected by the worker
    events: Vec<ControllerEvent>,
}

impl PlaybackController {
    /// Create a controller with an empty queue
    pub fn new(config: ControllerConfig, collaborators: Collaborators) -> Self {
        let shuffle = ShuffleEngine::new(&config);
        Self {
            config,
            catalog: collaborators.catalog,
            engine: collaborators.engine,
            focus: collaborators.focus,
            settings: collaborators.settings,
            queue: Queue::new(),
            shuffle,
            modes: Modes::default(),
            state: PlaybackState::Idle,
            volume: 1.0,
            resume_position_ms: None,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    // ===== Startup & Teardown =====

    /// Load the state saved by a previous session
    ///
    /// A queue saved against different storage is discarded, as are a cursor
    /// outside the queue, a history pointing outside the queue and a seek
    /// position past the end of the track.
    pub fn restore(&mut self) {
        match self.settings.load_modes() {
            Ok((repeat, shuffle)) => {
                self.modes = Modes::new(shuffle, repeat);
                if shuffle == ShuffleMode::Auto && !self.build_auto_pool() {
                    self.modes.shuffle = ShuffleMode::None;
                }
            }
            Err(e) => debug!(error = %e, "No saved modes"),
        }

        let saved = match self.settings.load_queue() {
            Ok(Some(saved)) => saved,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "Saved queue unreadable");
                return;
            }
        };

        match self.catalog.storage_identity() {
            Ok(identity) if identity == saved.storage_identity => {}
            Ok(identity) => {
                info!(
                    saved = saved.storage_identity,
                    current = identity,
                    "Storage changed since last session, discarding saved queue"
                );
                return;
            }
            Err(e) => {
                debug!(error = %e, "Storage identity unavailable, discarding saved queue");
                return;
            }
        }

        let len = saved.tracks.len();
        self.queue = Queue::with_tracks(saved.tracks, None);
        self.events.push(ControllerEvent::QueueChanged);

        match self.settings.load_history() {
            Ok(history) if history.iter().all(|&p| p < len) => {
                self.shuffle.restore_played(&history);
            }
            Ok(_) => debug!("Saved history points outside the queue, discarding"),
            Err(e) => debug!(error = %e, "Saved history unreadable"),
        }

        let cursor = match self.settings.load_cursor_position() {
            Ok(cursor) => cursor.filter(|&p| p < len),
            Err(e) => {
                debug!(error = %e, "Saved cursor unreadable");
                None
            }
        };
        let Some(cursor) = cursor else {
            info!(tracks = len, "Restored queue without a position");
            return;
        };

        self.queue.set_position(Some(cursor));
        if !self.open_current_and_next(0) {
            return;
        }
        self.events.push(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });

        let seek = self.settings.load_seek_position().unwrap_or(0);
        if seek <= self.engine.duration_ms() {
            self.engine.seek(seek);
        } else {
            debug!(seek, "Saved seek position past end of track, ignoring");
        }

        info!(tracks = len, position = cursor, "Restored playback state");
    }

    /// Persist everything and release the engine
    pub fn shutdown(&mut self) {
        self.timers.clear();
        if self.engine.is_initialized() {
            self.resume_position_ms = Some(self.engine.position_ms());
        }
        self.persist_all();
        self.engine.stop();
        self.state = PlaybackState::Idle;
        info!("Playback controller shut down");
    }

    // ===== Queue Management =====

    /// Replace the queue with `tracks` and open `position`
    ///
    /// Without a position a random entry is chosen. Opening the list that is
    /// already queued at the position already playing does nothing. Party
    /// shuffle falls back to the shuffle bag.
    pub fn open(&mut self, tracks: &[TrackRef], position: Option<usize>) {
        if tracks.is_empty() {
            return;
        }

        if self.modes.shuffle == ShuffleMode::Auto {
            self.modes.shuffle = ShuffleMode::Normal;
            self.shuffle.reset();
            self.notify(ControllerEvent::ShuffleModeChanged(ShuffleMode::Normal));
        }

        let before = self.queue.current();
        let old_position = self.queue.position();
        let changed = self.queue.replace_all(tracks);
        let position = match position {
            Some(p) => p.min(tracks.len() - 1),
            None => self.shuffle.random_index(tracks.len()),
        };

        if !changed && old_position == Some(position) && self.engine.is_initialized() {
            debug!(position, "List already open");
            return;
        }

        if changed {
            self.shuffle.reset_bag();
            self.notify(ControllerEvent::QueueChanged);
        }
        self.shuffle.clear_played();
        self.queue.set_position(Some(position));

        let was_playing = self.state == PlaybackState::Playing;
        let opened = self.open_current_and_next(self.config.open_retry_limit);
        if self.queue.current() != before {
            self.notify(ControllerEvent::TrackChanged {
                track: self.queue.current(),
            });
        }
        if opened && was_playing {
            self.play();
        }
    }

    /// Insert tracks into the queue
    ///
    /// `Now` jumps to the first inserted track and plays it. Enqueueing while
    /// nothing is active starts playback at the head.
    pub fn enqueue(&mut self, tracks: &[TrackRef], placement: Placement) {
        if tracks.is_empty() {
            return;
        }

        let idle = self.queue.position().is_none();
        let inserted = self.queue.enqueue(tracks, placement);
        self.notify(ControllerEvent::QueueChanged);

        let start = match placement {
            Placement::Now => Some(inserted.start),
            Placement::Next | Placement::Last if idle => Some(0),
            Placement::Next | Placement::Last => None,
        };

        match start {
            Some(position) => self.jump_to(position),
            None => self.prefetch_next(),
        }
    }

    /// Remove queue entries `first..=last`, returning how many were removed
    ///
    /// Removing the active entry moves on to the next one (or stops when the
    /// queue is left empty).
    pub fn remove_range(&mut self, first: usize, last: usize) -> usize {
        let removal = self.queue.remove_range(first, last);
        let count = removal.count();
        if count == 0 {
            return 0;
        }

        self.shuffle.forget_removed(*removal.range.start(), count);
        let collapsed = matches!(removal.delta, PositionDelta::Collapsed(_));
        self.queue.apply(removal.delta);
        self.notify(ControllerEvent::QueueChanged);

        if !collapsed {
            self.prefetch_next();
            return count;
        }

        if self.queue.is_empty() {
            self.engine.stop();
            self.schedule_idle_shutdown();
            self.set_state(PlaybackState::Idle);
        } else {
            let position = if self.modes.shuffle == ShuffleMode::None {
                Some(self.queue.position().unwrap_or(0))
            } else {
                self.next_step(true)
            };
            self.queue.set_position(position.or(Some(0)));

            let was_playing = self.state == PlaybackState::Playing;
            self.engine.stop();
            if self.open_current_and_next(self.config.open_retry_limit) && was_playing {
                self.play();
            }
        }

        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        count
    }

    /// Remove every occurrence of `track`, returning how many were removed
    pub fn remove_track(&mut self, track: TrackRef) -> usize {
        let indices = self.queue.indices_of(track);
        indices
            .into_iter()
            .rev()
            .map(|index| self.remove_range(index, index))
            .sum()
    }

    /// Move one queue entry
    pub fn move_item(&mut self, from: usize, to: usize) {
        if self.queue.is_empty() {
            return;
        }
        let last = self.queue.len() - 1;
        let (from, to) = (from.min(last), to.min(last));
        if from == to {
            return;
        }

        let delta = self.queue.move_item(from, to);
        self.queue.apply(delta);
        self.shuffle.follow_move(from, to);
        self.notify(ControllerEvent::QueueChanged);
        self.prefetch_next();
    }

    /// Jump to a queue entry and play it
    pub fn set_queue_position(&mut self, index: usize) {
        if index >= self.queue.len() {
            debug!(index, len = self.queue.len(), "Queue position out of range");
            return;
        }
        self.jump_to(index);
    }

    /// Remove everything from the queue and stop
    pub fn clear_queue(&mut self) {
        if !self.queue.is_empty() {
            self.remove_range(0, usize::MAX);
        }
    }

    // ===== Playback Control =====

    /// Start or resume playback
    ///
    /// Does nothing when focus is denied. With nothing queued, party shuffle
    /// is switched on. Near the end of a track, skips to the next one first.
    pub fn play(&mut self) {
        if !self.focus.request_focus() {
            debug!("Audio focus denied, not starting playback");
            return;
        }

        if !self.engine.is_initialized() {
            if self.queue.is_empty() {
                info!("Nothing queued, starting party shuffle");
                self.set_shuffle_mode(ShuffleMode::Auto);
                return;
            }
            if self.queue.position().is_none() {
                self.queue.set_position(Some(0));
            }

            let before = self.queue.current();
            let resume = self.resume_position_ms.take();
            if !self.open_current_and_next(self.config.open_retry_limit) {
                return;
            }
            if self.queue.current() != before {
                self.notify(ControllerEvent::TrackChanged {
                    track: self.queue.current(),
                });
            } else if let Some(position_ms) = resume {
                let duration = self.engine.duration_ms();
                self.engine.seek(position_ms.min(duration));
            }
        }

        let duration = self.engine.duration_ms();
        if self.modes.repeat != RepeatMode::Current
            && duration > self.config.near_end_ms
            && self.engine.position_ms() >= duration - self.config.near_end_ms
        {
            self.goto_next(true);
            return;
        }

        self.engine.start();
        self.timers.cancel(TimerKind::FadeDown);
        self.timers.schedule(TimerKind::FadeIn, Duration::ZERO);
        self.timers.cancel(TimerKind::IdleShutdown);
        self.set_state(PlaybackState::Playing);
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.timers.cancel(TimerKind::FadeIn);
        match self.state {
            PlaybackState::Playing => {
                self.engine.pause();
                self.schedule_idle_shutdown();
                self.set_state(PlaybackState::Paused);
            }
            // An explicit pause overrides the pending focus resume
            PlaybackState::PausedByFocusLoss => self.set_state(PlaybackState::Paused),
            PlaybackState::Idle | PlaybackState::Paused => {}
        }
    }

    /// Pause when playing, play otherwise
    pub fn toggle_pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop playback and release the current source
    pub fn stop(&mut self) {
        self.timers.cancel(TimerKind::FadeIn);
        self.timers.cancel(TimerKind::FadeDown);
        self.engine.stop();
        self.resume_position_ms = None;
        self.schedule_idle_shutdown();
        self.set_state(PlaybackState::Idle);
    }

    /// Skip to the next track (user request)
    pub fn next(&mut self) {
        self.goto_next(true);
    }

    /// Advance to the next track
    ///
    /// `force` marks a user skip; natural advances pass `false`. At the end
    /// of a non-repeating queue playback goes idle.
    pub fn goto_next(&mut self, force: bool) {
        if self.queue.is_empty() {
            debug!("No play queue");
            self.schedule_idle_shutdown();
            return;
        }

        let Some(position) = self.next_step(force) else {
            debug!("Reached end of queue");
            self.schedule_idle_shutdown();
            self.set_state(PlaybackState::Idle);
            return;
        };

        self.engine.stop();
        self.queue.set_position(Some(position));
        let opened = self.open_current_and_next(self.config.open_retry_limit);
        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        if opened {
            self.play();
        }
    }

    /// Go back one track
    ///
    /// The shuffle bag walks back through played positions; other modes step
    /// back, wrapping to the tail.
    pub fn prev(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let position = match self.modes.shuffle {
            ShuffleMode::Normal => match self.shuffle.pop_played(self.queue.len()) {
                Some(position) => position,
                None => {
                    debug!("No shuffle history to go back to");
                    return;
                }
            },
            ShuffleMode::None | ShuffleMode::Auto => match self.queue.position() {
                Some(p) if p > 0 => p - 1,
                _ => self.queue.len() - 1,
            },
        };

        self.engine.stop();
        self.queue.set_position(Some(position));
        let opened = self.open_current_and_next(self.config.open_retry_limit);
        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        if opened {
            self.play();
        }
    }

    /// "Previous" button: restart a track that played a while, else go back
    pub fn go_to_prev(&mut self) {
        if self.engine.position_ms() < self.config.restart_threshold_ms {
            self.prev();
        } else {
            self.seek(0);
            self.play();
        }
    }

    /// Seek within the current track, returning the position reached
    pub fn seek(&mut self, position_ms: u64) -> u64 {
        if !self.engine.is_initialized() {
            return 0;
        }
        let duration = self.engine.duration_ms();
        let reached = self.engine.seek(position_ms.min(duration));
        self.notify(ControllerEvent::PositionChanged {
            position_ms: reached,
        });
        reached
    }

    // ===== Shuffle & Repeat =====

    /// Set the shuffle mode
    ///
    /// Any switch forgets both histories. Party shuffle rebuilds the queue
    /// from the whole library and starts playing; when the library is empty
    /// shuffle is turned off instead.
    pub fn set_shuffle_mode(&mut self, mode: ShuffleMode) {
        if self.modes.shuffle == mode && !self.queue.is_empty() {
            return;
        }

        self.modes.shuffle = mode;
        self.shuffle.reset();

        if mode == ShuffleMode::Auto {
            if self.build_auto_pool() {
                self.start_party();
                return;
            }
            self.modes.shuffle = ShuffleMode::None;
        }

        self.prefetch_next();
        self.notify(ControllerEvent::ShuffleModeChanged(self.modes.shuffle));
    }

    /// Set the repeat mode
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.modes.repeat == mode {
            return;
        }
        self.modes.repeat = mode;
        self.prefetch_next();
        self.notify(ControllerEvent::RepeatModeChanged(mode));
    }

    /// Cycle repeat None → All → Current → None
    pub fn cycle_repeat(&mut self) {
        let next = self.modes.cycle_repeat();
        self.set_repeat_mode(next.repeat);
        if next.shuffle != self.modes.shuffle {
            self.set_shuffle_mode(next.shuffle);
        }
    }

    /// Toggle the shuffle bag on or off
    pub fn toggle_shuffle(&mut self) {
        let next = self.modes.toggle_shuffle();
        self.set_shuffle_mode(next.shuffle);
        if next.repeat != self.modes.repeat {
            self.set_repeat_mode(next.repeat);
        }
    }

    // ===== Engine & Focus Callbacks =====

    /// React to an engine notification
    pub fn on_engine_event(&mut self, event: EngineEvent) {
        debug!(?event, "Engine event");
        match event {
            EngineEvent::EndOfTrack => {
                if self.modes.repeat == RepeatMode::Current {
                    self.seek(0);
                    self.play();
                } else {
                    self.goto_next(false);
                }
            }
            EngineEvent::AdvancedToPrefetched => self.adopt_prefetched(),
            EngineEvent::Died => {
                if self.state == PlaybackState::Playing {
                    self.goto_next(true);
                } else {
                    self.open_current_and_next(self.config.open_retry_limit);
                }
            }
        }
    }

    /// React to an audio focus change
    pub fn on_focus_change(&mut self, change: FocusChange) {
        debug!(?change, state = ?self.state, "Focus change");
        match change {
            FocusChange::Loss => self.pause(),
            FocusChange::LossTransient => {
                if self.state == PlaybackState::Playing {
                    self.pause();
                    self.set_state(PlaybackState::PausedByFocusLoss);
                }
            }
            FocusChange::LossTransientCanDuck => {
                self.timers.cancel(TimerKind::FadeIn);
                self.timers.schedule(TimerKind::FadeDown, Duration::ZERO);
            }
            FocusChange::Gain => {
                if self.state == PlaybackState::PausedByFocusLoss {
                    self.set_volume(0.0);
                    self.play();
                } else {
                    self.timers.cancel(TimerKind::FadeDown);
                    self.timers.schedule(TimerKind::FadeIn, Duration::ZERO);
                }
            }
        }
    }

    /// Run a timer that came due
    pub fn on_timer(&mut self, kind: TimerKind) {
        let step = Duration::from_millis(self.config.fade_step_ms);
        match kind {
            TimerKind::FadeIn => {
                let volume = (self.volume + self.config.fade_in_step).min(1.0);
                self.set_volume(volume);
                if volume < 1.0 {
                    self.timers.schedule(TimerKind::FadeIn, step);
                }
            }
            TimerKind::FadeDown => {
                let volume = (self.volume - self.config.duck_step).max(self.config.duck_floor);
                self.set_volume(volume);
                if volume > self.config.duck_floor {
                    self.timers.schedule(TimerKind::FadeDown, step);
                }
            }
            TimerKind::IdleShutdown => self.idle_shutdown(),
        }
    }

    /// Run every timer due at `now`
    pub fn fire_due_timers(&mut self, now: Instant) {
        for kind in self.timers.take_due(now) {
            self.on_timer(kind);
        }
    }

    /// Take the events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }

    // ===== State Queries =====

    /// Queue contents
    pub fn get_queue(&self) -> &[TrackRef] {
        self.queue.tracks()
    }

    /// Active queue position
    pub fn get_queue_position(&self) -> Option<usize> {
        self.queue.position()
    }

    /// Prefetched queue position
    pub fn get_next_position(&self) -> Option<usize> {
        self.queue.next_position()
    }

    /// Active track
    pub fn get_current_track(&self) -> Option<TrackRef> {
        self.queue.current()
    }

    /// Metadata of the active track, `None` when the catalog has none
    pub fn get_current_metadata(&self) -> Option<TrackMetadata> {
        let track = self.queue.current()?;
        match self.catalog.resolve(track) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!(%track, error = %e, "No metadata for track");
                None
            }
        }
    }

    pub fn get_state(&self) -> PlaybackState {
        self.state
    }

    pub fn get_modes(&self) -> Modes {
        self.modes
    }

    pub fn get_shuffle(&self) -> ShuffleMode {
        self.modes.shuffle
    }

    pub fn get_repeat(&self) -> RepeatMode {
        self.modes.repeat
    }

    /// Played positions used by "previous", oldest first
    pub fn get_history(&self) -> Vec<usize> {
        self.shuffle.played().to_vec()
    }

    /// Pool indices drawn by party shuffle, oldest first
    pub fn get_drawn_history(&self) -> Vec<usize> {
        self.shuffle.drawn().to_vec()
    }

    /// Position inside the active track
    pub fn get_position(&self) -> u64 {
        if self.engine.is_initialized() {
            self.engine.position_ms()
        } else {
            self.resume_position_ms.unwrap_or(0)
        }
    }

    /// Duration of the active track
    pub fn get_duration(&self) -> u64 {
        if self.engine.is_initialized() {
            self.engine.duration_ms()
        } else {
            0
        }
    }

    pub fn get_audio_session_id(&self) -> i32 {
        self.engine.audio_session_id()
    }

    /// Volume last handed to the engine
    pub fn get_volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ===== Internals =====

    /// Next position from the shuffle engine
    ///
    /// When the shuffle order cannot be built, shuffle is switched off and
    /// the queue is stepped linearly instead.
    fn next_step(&mut self, forced: bool) -> Option<usize> {
        match self.shuffle.next_position(&mut self.queue, self.modes, forced) {
            Ok(step) => {
                if step.queue_changed {
                    self.notify(ControllerEvent::QueueChanged);
                }
                step.position
            }
            Err(e) => {
                warn!(error = %e, "Turning shuffle off");
                self.modes.shuffle = ShuffleMode::None;
                self.shuffle.reset();
                self.notify(ControllerEvent::ShuffleModeChanged(ShuffleMode::None));
                self.shuffle
                    .next_position(&mut self.queue, self.modes, forced)
                    .ok()
                    .and_then(|step| step.position)
            }
        }
    }

    /// Recompute the prefetched position and hand it to the engine
    fn prefetch_next(&mut self) {
        let next = if self.queue.is_empty() {
            None
        } else {
            self.next_step(false)
        };
        self.queue.set_next_position(next);
        self.engine.set_next_source(self.queue.next_track());
    }

    /// Open the active entry, skipping forward past entries that fail
    fn open_current(&mut self, retries: u32) -> bool {
        let mut failures = 0;
        loop {
            let Some(track) = self.queue.current() else {
                return false;
            };
            if self.engine.set_current_source(track) {
                self.resume_position_ms = None;
                return true;
            }

            warn!(%track, "Failed to open track");
            if failures >= retries || self.queue.len() <= 1 {
                return false;
            }
            failures += 1;

            // Repeat-current would keep retrying the same entry
            let forced = self.modes.repeat == RepeatMode::Current;
            match self.next_step(forced) {
                Some(position) => self.queue.set_position(Some(position)),
                None => return false,
            }
        }
    }

    /// Open the active entry and prefetch the one after it
    ///
    /// Goes idle with no active track when nothing could be opened.
    fn open_current_and_next(&mut self, retries: u32) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        if !self.open_current(retries) {
            warn!("Giving up opening tracks");
            self.engine.stop();
            self.queue.set_position(None);
            self.queue.set_next_position(None);
            self.schedule_idle_shutdown();
            self.set_state(PlaybackState::Idle);
            return false;
        }
        self.prefetch_next();
        true
    }

    /// Stop, move to `position`, open and play
    fn jump_to(&mut self, position: usize) {
        self.engine.stop();
        self.queue.set_position(Some(position));
        let opened = self.open_current_and_next(self.config.open_retry_limit);
        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        if opened {
            self.play();
        }
    }

    /// The engine moved on to the prefetched source by itself
    fn adopt_prefetched(&mut self) {
        let Some(next) = self.queue.next_position() else {
            warn!("Engine advanced without a prefetched track");
            return;
        };

        if self.modes.shuffle == ShuffleMode::Normal {
            if let Some(left) = self.queue.position() {
                self.shuffle.record_played(left);
            }
        }
        self.queue.set_position(Some(next));
        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        self.prefetch_next();
    }

    /// Snapshot the library for party shuffle
    fn build_auto_pool(&mut self) -> bool {
        match self.catalog.all_tracks() {
            Ok(tracks) if !tracks.is_empty() => {
                debug!(tracks = tracks.len(), "Built party shuffle pool");
                self.shuffle.set_pool(tracks);
                true
            }
            Ok(_) => {
                debug!("Library is empty, party shuffle unavailable");
                false
            }
            Err(e) => {
                debug!(error = %e, "Library unavailable, party shuffle unavailable");
                false
            }
        }
    }

    /// Replace the queue with a fresh party shuffle window and play it
    fn start_party(&mut self) {
        self.queue.clear();
        self.notify(ControllerEvent::ShuffleModeChanged(ShuffleMode::Auto));
        if self.next_step(true).is_none() {
            return;
        }
        self.queue.set_position(Some(0));

        self.engine.stop();
        let opened = self.open_current_and_next(self.config.open_retry_limit);
        self.notify(ControllerEvent::TrackChanged {
            track: self.queue.current(),
        });
        if opened {
            self.play();
        }
    }

    fn idle_shutdown(&mut self) {
        if matches!(
            self.state,
            PlaybackState::Playing | PlaybackState::PausedByFocusLoss
        ) {
            debug!(state = ?self.state, "Idle shutdown skipped");
            return;
        }

        if self.engine.is_initialized() {
            self.resume_position_ms = Some(self.engine.position_ms());
        }
        self.persist_all();
        self.timers.clear();
        self.engine.stop();
        self.set_state(PlaybackState::Idle);
        info!("Released playback engine after idle timeout");
    }

    fn schedule_idle_shutdown(&mut self) {
        self.timers.schedule(
            TimerKind::IdleShutdown,
            Duration::from_millis(self.config.idle_delay_ms),
        );
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.notify(ControllerEvent::PlaybackStateChanged { state });
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.engine.set_volume(volume);
    }

    // ===== Persistence =====

    /// Record an event and persist what it touched
    fn notify(&mut self, event: ControllerEvent) {
        self.events.push(event);
        match event.persistence() {
            Persistence::None => {}
            Persistence::Cursor => self.persist_cursor(),
            Persistence::Full => self.persist_all(),
        }
    }

    fn persist_cursor(&mut self) {
        let position = self.get_position();
        log_persist(
            "cursor",
            self.settings.save_cursor_position(self.queue.position()),
        );
        log_persist("seek", self.settings.save_seek_position(position));
        log_persist(
            "modes",
            self.settings
                .save_modes(self.modes.repeat, self.modes.shuffle),
        );
    }

    fn persist_all(&mut self) {
        let storage_identity = match self.catalog.storage_identity() {
            Ok(identity) => identity,
            Err(e) => {
                debug!(error = %e, "Storage identity unavailable, saving cursor only");
                self.persist_cursor();
                return;
            }
        };

        let state = SavedState {
            storage_identity,
            queue: self.queue.tracks().to_vec(),
            history: self.shuffle.played().to_vec(),
            cursor_position: self.queue.position(),
            seek_position_ms: self.get_position(),
            repeat_mode: self.modes.repeat,
            shuffle_mode: self.modes.shuffle,
        };
        log_persist("state", self.settings.save_state(&state));
    }
}

fn log_persist(what: &'static str, result: Result<(), SettingsError>) {
    if let Err(e) = result {
        debug!(what, error = %e, "Failed to persist playback state");
    }
}
