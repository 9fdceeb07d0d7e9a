//! Cadence - Queue & Shuffle Playback Control
//!
//! Background playback controller for a personal music library.
//!
//! This crate provides:
//! - Play queue with explicit position deltas for every edit
//! - Shuffle bag (every entry once per cycle) and party shuffle (perpetual
//!   lookahead drawn from the whole library)
//! - Repeat modes (None, Current, All)
//! - Bounded histories for "previous" and for repeat avoidance
//! - Gapless transitions via a prefetched next source
//! - Audio focus handling with fade-in and ducking
//! - State persistence and restore
//! - A serial worker that applies commands in arrival order
//!
//! # Architecture
//!
//! `cadence-playback` decodes no audio and renders no UI. Platforms plug in
//! through traits:
//! - [`PlaybackEngine`] plays a current source and holds a prefetched one
//! - [`AudioFocus`] grants or denies focus
//! - [`TrackCatalog`] resolves metadata and lists the library
//! - [`SettingsStore`] persists state between sessions
//!
//! # Example: Shuffle and Repeat
//!
//! ```rust
//! use cadence_playback::{Modes, RepeatMode, ShuffleMode, Transition};
//!
//! let modes = Modes::new(ShuffleMode::None, RepeatMode::Current);
//!
//! // Natural advances stay on the track, user skips move on
//! assert_eq!(modes.transition(false), Transition::Stay);
//! assert_eq!(modes.transition(true), Transition::Linear { wrap: true });
//!
//! // Turning shuffle on while repeating one track repeats the queue instead
//! let modes = modes.toggle_shuffle();
//! assert_eq!(modes, Modes::new(ShuffleMode::Normal, RepeatMode::All));
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use cadence_playback::{
//!     AlwaysGranted, Collaborators, Command, ControllerConfig, MemoryCatalog,
//!     MemorySettings, PlaybackController, PlaybackEngine, PlaybackService, TrackRef,
//! };
//!
//! // Implement PlaybackEngine for your platform
//! struct MyEngine {
//!     // ... platform-specific player
//! }
//!
//! impl PlaybackEngine for MyEngine {
//!     fn set_current_source(&mut self, track: TrackRef) -> bool { true }
//!     fn set_next_source(&mut self, track: Option<TrackRef>) {}
//!     fn start(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek(&mut self, position_ms: u64) -> u64 { position_ms }
//!     fn position_ms(&self) -> u64 { 0 }
//!     fn duration_ms(&self) -> u64 { 180_000 }
//!     fn is_initialized(&self) -> bool { true }
//!     fn set_volume(&mut self, volume: f32) {}
//! }
//!
//! let controller = PlaybackController::new(
//!     ControllerConfig::default(),
//!     Collaborators {
//!         catalog: Box::new(MemoryCatalog::synthetic(100)),
//!         engine: Box::new(MyEngine {}),
//!         focus: Box::new(AlwaysGranted),
//!         settings: Box::new(MemorySettings::new()),
//!     },
//! );
//!
//! let service = PlaybackService::start(controller)?;
//! service.send_command(Command::Open {
//!     tracks: vec![TrackRef(1), TrackRef(2), TrackRef(3)],
//!     position: Some(0),
//! })?;
//! service.send_command(Command::Play)?;
//!
//! // Engine callbacks go through the same queue
//! let sender = service.sender();
//! sender.send(Command::Engine(cadence_playback::EngineEvent::EndOfTrack))?;
//! # Ok::<(), cadence_playback::PlaybackError>(())
//! ```

mod catalog;
mod config;
mod controller;
mod engine;
mod error;
mod events;
mod history;
mod modes;
pub mod queue;
mod random;
mod service;
mod settings;
mod shuffle;
mod timers;
pub mod types;

// Public exports
pub use catalog::{MemoryCatalog, TrackCatalog};
pub use config::ControllerConfig;
pub use controller::{Collaborators, PlaybackController};
pub use engine::{AlwaysGranted, AudioFocus, EngineEvent, PlaybackEngine};
pub use error::{CatalogError, PlaybackError, Result, SettingsError};
pub use events::{ControllerEvent, Persistence};
pub use history::{BoundedHistory, DEFAULT_HISTORY_CAPACITY};
pub use modes::{Modes, Transition};
pub use queue::{Queue, Removal};
pub use random::DedupRandom;
pub use service::{Command, CommandSender, PlaybackService};
pub use settings::{JsonFileSettings, MemorySettings, SavedQueue, SavedState, SettingsStore};
pub use shuffle::{NextStep, ShuffleEngine};
pub use timers::{TimerKind, Timers};
pub use types::{
    FocusChange, Placement, PlaybackState, PositionDelta, RepeatMode, ShuffleMode, TrackMetadata,
    TrackRef,
};
