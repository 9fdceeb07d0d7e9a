//! Mock collaborators shared by the integration tests
//!
//! Each mock keeps its state behind an `Arc<Mutex<_>>` so a test can keep a
//! handle after the controller took ownership of the boxed mock.

#![allow(dead_code)]

use cadence_playback::{
    AudioFocus, CatalogError, Collaborators, ControllerConfig, ControllerEvent, MemoryCatalog,
    MemorySettings, PlaybackController, PlaybackEngine, SettingsStore, TrackCatalog,
    TrackMetadata, TrackRef,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

// ===== Engine =====

/// What the mock engine has been asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    pub current: Option<TrackRef>,
    pub next: Option<TrackRef>,
    pub opened: Vec<TrackRef>,
    pub broken: HashSet<TrackRef>,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: f32,
    pub stops: usize,
}

/// Engine that records calls and plays nothing
#[derive(Debug, Clone)]
pub struct MockEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog {
                duration_ms: 200_000,
                volume: 1.0,
                ..EngineLog::default()
            })),
        }
    }

    pub fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }

    pub fn break_track(&self, track: TrackRef) {
        self.log().broken.insert(track);
    }

    pub fn set_position(&self, position_ms: u64) {
        self.log().position_ms = position_ms;
    }

    /// Simulate the engine switching to its prefetched source
    pub fn advance_to_prefetched(&self) {
        let mut log = self.log();
        log.current = log.next.take();
        log.position_ms = 0;
    }
}

impl PlaybackEngine for MockEngine {
    fn set_current_source(&mut self, track: TrackRef) -> bool {
        let mut log = self.log();
        log.opened.push(track);
        if log.broken.contains(&track) {
            log.current = None;
            return false;
        }
        log.current = Some(track);
        log.position_ms = 0;
        true
    }

    fn set_next_source(&mut self, track: Option<TrackRef>) {
        self.log().next = track;
    }

    fn start(&mut self) {
        self.log().playing = true;
    }

    fn pause(&mut self) {
        self.log().playing = false;
    }

    fn stop(&mut self) {
        let mut log = self.log();
        log.playing = false;
        log.current = None;
        log.next = None;
        log.stops += 1;
    }

    fn seek(&mut self, position_ms: u64) -> u64 {
        self.log().position_ms = position_ms;
        position_ms
    }

    fn position_ms(&self) -> u64 {
        self.log().position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.log().duration_ms
    }

    fn is_initialized(&self) -> bool {
        self.log().current.is_some()
    }

    fn set_volume(&mut self, volume: f32) {
        self.log().volume = volume;
    }

    fn audio_session_id(&self) -> i32 {
        7
    }
}

// ===== Focus =====

/// Focus arbiter whose answer a test can flip
#[derive(Debug, Clone)]
pub struct MockFocus {
    granted: Arc<Mutex<bool>>,
}

impl MockFocus {
    pub fn new() -> Self {
        Self {
            granted: Arc::new(Mutex::new(true)),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        *self.granted.lock().unwrap() = granted;
    }
}

impl AudioFocus for MockFocus {
    fn request_focus(&mut self) -> bool {
        *self.granted.lock().unwrap()
    }
}

// ===== Catalog =====

/// Catalog that fails every lookup
#[derive(Debug, Clone, Copy)]
pub struct BrokenCatalog;

impl TrackCatalog for BrokenCatalog {
    fn resolve(&self, _track: TrackRef) -> Result<TrackMetadata, CatalogError> {
        Err(CatalogError::Unavailable("offline".to_string()))
    }

    fn all_tracks(&self) -> Result<Vec<TrackRef>, CatalogError> {
        Err(CatalogError::Unavailable("offline".to_string()))
    }

    fn storage_identity(&self) -> Result<i64, CatalogError> {
        Err(CatalogError::Unavailable("offline".to_string()))
    }
}

// ===== Harness =====

/// Controller plus handles on its mocks
pub struct Harness {
    pub controller: PlaybackController,
    pub engine: MockEngine,
    pub focus: MockFocus,
    pub settings: MemorySettings,
}

impl Harness {
    /// Controller over a synthetic library of `library` tracks
    pub fn new(library: u64) -> Self {
        Self::with_parts(
            test_config(),
            Box::new(MemoryCatalog::synthetic(library)),
            MemorySettings::new(),
        )
    }

    pub fn with_parts(
        config: ControllerConfig,
        catalog: Box<dyn TrackCatalog>,
        settings: MemorySettings,
    ) -> Self {
        let store = Box::new(settings.clone());
        Self::with_store(config, catalog, store, settings)
    }

    /// Controller persisting into `store`; `settings` is kept as the handle
    pub fn with_store(
        config: ControllerConfig,
        catalog: Box<dyn TrackCatalog>,
        store: Box<dyn SettingsStore>,
        settings: MemorySettings,
    ) -> Self {
        let engine = MockEngine::new();
        let focus = MockFocus::new();
        let controller = PlaybackController::new(
            config,
            Collaborators {
                catalog,
                engine: Box::new(engine.clone()),
                focus: Box::new(focus.clone()),
                settings: store,
            },
        );
        Self {
            controller,
            engine,
            focus,
            settings,
        }
    }

    /// Open `ids` at `position` and start playing
    pub fn open_and_play(&mut self, ids: &[u64], position: usize) {
        self.controller.open(&refs(ids), Some(position));
        self.controller.play();
        self.controller.drain_events();
    }

    pub fn events(&mut self) -> Vec<ControllerEvent> {
        self.controller.drain_events()
    }
}

/// Deterministic configuration
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        rng_seed: Some(0xCAD),
        ..ControllerConfig::default()
    }
}

pub fn refs(ids: &[u64]) -> Vec<TrackRef> {
    ids.iter().copied().map(TrackRef).collect()
}

pub fn count_queue_changed(events: &[ControllerEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::QueueChanged))
        .count()
}

pub fn count_track_changed(events: &[ControllerEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::TrackChanged { .. }))
        .count()
}

/// Settings store whose every call fails
#[derive(Debug, Default)]
pub struct FailingSettings;

impl SettingsStore for FailingSettings {
    fn save_queue(
        &mut self,
        _queue: &[TrackRef],
        _storage_identity: i64,
    ) -> Result<(), cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn save_history(&mut self, _history: &[usize]) -> Result<(), cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn save_cursor_position(
        &mut self,
        _position: Option<usize>,
    ) -> Result<(), cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn save_seek_position(&mut self, _position_ms: u64) -> Result<(), cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn save_modes(
        &mut self,
        _repeat: cadence_playback::RepeatMode,
        _shuffle: cadence_playback::ShuffleMode,
    ) -> Result<(), cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn load_queue(
        &self,
    ) -> Result<Option<cadence_playback::SavedQueue>, cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn load_history(&self) -> Result<Vec<usize>, cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn load_cursor_position(&self) -> Result<Option<usize>, cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn load_seek_position(&self) -> Result<u64, cadence_playback::SettingsError> {
        Err(io_error())
    }

    fn load_modes(
        &self,
    ) -> Result<(cadence_playback::RepeatMode, cadence_playback::ShuffleMode), cadence_playback::SettingsError>
    {
        Err(io_error())
    }
}

fn io_error() -> cadence_playback::SettingsError {
    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into()
}
