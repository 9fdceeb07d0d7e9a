//! Platform-agnostic playback engine and audio focus traits
//!
//! The controller never decodes audio. Platforms plug in an engine that
//! plays one "current" source and can hold a prefetched "next" source for
//! gapless transitions.

use serde::{Deserialize, Serialize};

use crate::types::TrackRef;

/// Audio engine driven by the controller
///
/// Implementors report back through [`EngineEvent`]s delivered to the
/// playback worker, never by calling into the controller directly.
pub trait PlaybackEngine: Send {
    /// Load `track` as the playing source
    ///
    /// # Returns
    /// * `true` - Source is initialized and ready to start
    /// * `false` - Track could not be opened
    fn set_current_source(&mut self, track: TrackRef) -> bool;

    /// Prefetch the source that follows the current one, or drop it
    fn set_next_source(&mut self, track: Option<TrackRef>);

    /// Start or resume output
    fn start(&mut self);

    /// Pause output, keeping the source
    fn pause(&mut self);

    /// Stop output and release the sources
    fn stop(&mut self);

    /// Seek the current source; returns the position actually reached
    fn seek(&mut self, position_ms: u64) -> u64;

    /// Current playback position
    fn position_ms(&self) -> u64;

    /// Duration of the current source
    fn duration_ms(&self) -> u64;

    /// Whether a current source is loaded
    fn is_initialized(&self) -> bool;

    /// Output volume, 0.0 to 1.0
    fn set_volume(&mut self, volume: f32);

    /// Audio session identifier for effect attachment
    fn audio_session_id(&self) -> i32 {
        0
    }
}

/// Source of audio focus decisions
pub trait AudioFocus: Send {
    /// Ask for focus before starting playback
    ///
    /// Returns `false` when another application holds focus; playback then
    /// does not start.
    fn request_focus(&mut self) -> bool;
}

/// Focus arbiter that always grants focus
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl AudioFocus for AlwaysGranted {
    fn request_focus(&mut self) -> bool {
        true
    }
}

/// Asynchronous notifications from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Current source finished and no prefetched source took over
    EndOfTrack,

    /// Engine switched to the prefetched source on its own
    AdvancedToPrefetched,

    /// Engine lost its backend and needs its sources reloaded
    Died,
}

/// Scripted engine for unit tests
///
/// Tracks in `broken` fail to open.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct DummyEngine {
    pub current: Option<TrackRef>,
    pub next: Option<TrackRef>,
    pub opened: Vec<TrackRef>,
    pub broken: Vec<TrackRef>,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: f32,
}

#[cfg(test)]
impl PlaybackEngine for DummyEngine {
    fn set_current_source(&mut self, track: TrackRef) -> bool {
        self.opened.push(track);
        if self.broken.contains(&track) {
            self.current = None;
            return false;
        }
        self.current = Some(track);
        self.position_ms = 0;
        if self.duration_ms == 0 {
            self.duration_ms = 180_000;
        }
        true
    }

    fn set_next_source(&mut self, track: Option<TrackRef>) {
        self.next = track;
    }

    fn start(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
        self.current = None;
        self.next = None;
    }

    fn seek(&mut self, position_ms: u64) -> u64 {
        self.position_ms = position_ms;
        position_ms
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}
