//! Persisted controller state
//!
//! The controller writes through a [`SettingsStore`] after every change it
//! announces (except position ticks) and reads it back once on startup.
//! Every call is best-effort: the controller logs failures and carries on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::SettingsError;
use crate::types::{RepeatMode, ShuffleMode, TrackRef};

/// Saved queue together with the storage it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQueue {
    /// Tracks in play order
    pub tracks: Vec<TrackRef>,

    /// Catalog storage identity at save time
    pub storage_identity: i64,
}

/// Everything the controller persists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedState {
    /// Catalog storage identity the queue belongs to
    pub storage_identity: i64,

    /// Queue contents
    pub queue: Vec<TrackRef>,

    /// Played queue positions, oldest first
    pub history: Vec<usize>,

    /// Active queue position
    pub cursor_position: Option<usize>,

    /// Position inside the active track
    pub seek_position_ms: u64,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Shuffle mode
    pub shuffle_mode: ShuffleMode,
}

/// Storage for controller state between sessions
pub trait SettingsStore: Send {
    fn save_queue(&mut self, queue: &[TrackRef], storage_identity: i64)
        -> Result<(), SettingsError>;

    fn save_history(&mut self, history: &[usize]) -> Result<(), SettingsError>;

    fn save_cursor_position(&mut self, position: Option<usize>) -> Result<(), SettingsError>;

    fn save_seek_position(&mut self, position_ms: u64) -> Result<(), SettingsError>;

    fn save_modes(&mut self, repeat: RepeatMode, shuffle: ShuffleMode)
        -> Result<(), SettingsError>;

    /// Saved queue, `None` when nothing was saved
    fn load_queue(&self) -> Result<Option<SavedQueue>, SettingsError>;

    fn load_history(&self) -> Result<Vec<usize>, SettingsError>;

    fn load_cursor_position(&self) -> Result<Option<usize>, SettingsError>;

    fn load_seek_position(&self) -> Result<u64, SettingsError>;

    fn load_modes(&self) -> Result<(RepeatMode, ShuffleMode), SettingsError>;

    /// Write the complete state
    ///
    /// Stores that can write everything at once should override this.
    fn save_state(&mut self, state: &SavedState) -> Result<(), SettingsError> {
        self.save_queue(&state.queue, state.storage_identity)?;
        self.save_history(&state.history)?;
        self.save_cursor_position(state.cursor_position)?;
        self.save_seek_position(state.seek_position_ms)?;
        self.save_modes(state.repeat_mode, state.shuffle_mode)
    }
}

fn saved_queue(state: &SavedState) -> Option<SavedQueue> {
    if state.queue.is_empty() {
        return None;
    }
    Some(SavedQueue {
        tracks: state.queue.clone(),
        storage_identity: state.storage_identity,
    })
}

// ===== In-memory store =====

#[derive(Debug, Default)]
struct MemoryInner {
    state: SavedState,
    writes: usize,
}

/// In-memory settings store
///
/// Clones share the same state, so a caller can keep a handle after giving
/// one to the controller.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemorySettings {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `state`
    pub fn with_state(state: SavedState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner { state, writes: 0 })),
        }
    }

    /// Copy of the stored state
    pub fn snapshot(&self) -> SavedState {
        self.lock().state.clone()
    }

    /// Number of individual save calls so far
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut SavedState)) {
        let mut inner = self.lock();
        f(&mut inner.state);
        inner.writes += 1;
    }
}

impl SettingsStore for MemorySettings {
    fn save_queue(
        &mut self,
        queue: &[TrackRef],
        storage_identity: i64,
    ) -> Result<(), SettingsError> {
        self.update(|s| {
            s.queue = queue.to_vec();
            s.storage_identity = storage_identity;
        });
        Ok(())
    }

    fn save_history(&mut self, history: &[usize]) -> Result<(), SettingsError> {
        self.update(|s| s.history = history.to_vec());
        Ok(())
    }

    fn save_cursor_position(&mut self, position: Option<usize>) -> Result<(), SettingsError> {
        self.update(|s| s.cursor_position = position);
        Ok(())
    }

    fn save_seek_position(&mut self, position_ms: u64) -> Result<(), SettingsError> {
        self.update(|s| s.seek_position_ms = position_ms);
        Ok(())
    }

    fn save_modes(&mut self, repeat: RepeatMode, shuffle: ShuffleMode) -> Result<(), SettingsError> {
        self.update(|s| {
            s.repeat_mode = repeat;
            s.shuffle_mode = shuffle;
        });
        Ok(())
    }

    fn load_queue(&self) -> Result<Option<SavedQueue>, SettingsError> {
        Ok(saved_queue(&self.lock().state))
    }

    fn load_history(&self) -> Result<Vec<usize>, SettingsError> {
        Ok(self.lock().state.history.clone())
    }

    fn load_cursor_position(&self) -> Result<Option<usize>, SettingsError> {
        Ok(self.lock().state.cursor_position)
    }

    fn load_seek_position(&self) -> Result<u64, SettingsError> {
        Ok(self.lock().state.seek_position_ms)
    }

    fn load_modes(&self) -> Result<(RepeatMode, ShuffleMode), SettingsError> {
        let inner = self.lock();
        Ok((inner.state.repeat_mode, inner.state.shuffle_mode))
    }
}

// ===== JSON file store =====

/// Settings store backed by one JSON file
///
/// Every save rewrites the file through a temporary sibling and a rename,
/// so a crash never leaves a half-written state behind.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    state: SavedState,
}

impl JsonFileSettings {
    /// Open the store at `path`
    ///
    /// A missing file starts from empty state; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No saved state, starting empty");
                SavedState::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// State as last written
    pub fn state(&self) -> &SavedState {
        &self.state
    }

    fn flush(&self) -> Result<(), SettingsError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let bytes = serde_json::to_vec_pretty(&self.state)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn save_queue(
        &mut self,
        queue: &[TrackRef],
        storage_identity: i64,
    ) -> Result<(), SettingsError> {
        self.state.queue = queue.to_vec();
        self.state.storage_identity = storage_identity;
        self.flush()
    }

    fn save_history(&mut self, history: &[usize]) -> Result<(), SettingsError> {
        self.state.history = history.to_vec();
        self.flush()
    }

    fn save_cursor_position(&mut self, position: Option<usize>) -> Result<(), SettingsError> {
        self.state.cursor_position = position;
        self.flush()
    }

    fn save_seek_position(&mut self, position_ms: u64) -> Result<(), SettingsError> {
        self.state.seek_position_ms = position_ms;
        self.flush()
    }

    fn save_modes(&mut self, repeat: RepeatMode, shuffle: ShuffleMode) -> Result<(), SettingsError> {
        self.state.repeat_mode = repeat;
        self.state.shuffle_mode = shuffle;
        self.flush()
    }

    fn load_queue(&self) -> Result<Option<SavedQueue>, SettingsError> {
        Ok(saved_queue(&self.state))
    }

    fn load_history(&self) -> Result<Vec<usize>, SettingsError> {
        Ok(self.state.history.clone())
    }

    fn load_cursor_position(&self) -> Result<Option<usize>, SettingsError> {
        Ok(self.state.cursor_position)
    }

    fn load_seek_position(&self) -> Result<u64, SettingsError> {
        Ok(self.state.seek_position_ms)
    }

    fn load_modes(&self) -> Result<(RepeatMode, ShuffleMode), SettingsError> {
        Ok((self.state.repeat_mode, self.state.shuffle_mode))
    }

    fn save_state(&mut self, state: &SavedState) -> Result<(), SettingsError> {
        self.state = state.clone();
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_state() {
        let handle = MemorySettings::new();
        let mut store = handle.clone();

        store.save_queue(&[TrackRef(1), TrackRef(2)], 5).unwrap();
        store.save_cursor_position(Some(1)).unwrap();

        let state = handle.snapshot();
        assert_eq!(state.queue, vec![TrackRef(1), TrackRef(2)]);
        assert_eq!(state.storage_identity, 5);
        assert_eq!(state.cursor_position, Some(1));
        assert_eq!(handle.writes(), 2);
    }

    #[test]
    fn empty_saved_queue_loads_as_none() {
        let store = MemorySettings::new();
        assert_eq!(store.load_queue().unwrap(), None);
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileSettings::open(&path).unwrap();
        store.save_queue(&[TrackRef(7), TrackRef(8)], 3).unwrap();
        store.save_history(&[0]).unwrap();
        store
            .save_modes(RepeatMode::All, ShuffleMode::Normal)
            .unwrap();

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(
            reopened.load_queue().unwrap(),
            Some(SavedQueue {
                tracks: vec![TrackRef(7), TrackRef(8)],
                storage_identity: 3,
            })
        );
        assert_eq!(reopened.load_history().unwrap(), vec![0]);
        assert_eq!(
            reopened.load_modes().unwrap(),
            (RepeatMode::All, ShuffleMode::Normal)
        );
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            JsonFileSettings::open(&path),
            Err(SettingsError::Encoding(_))
        ));
    }
}
