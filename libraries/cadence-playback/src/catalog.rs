//! Track catalog
//!
//! The controller only handles [`TrackRef`]s. Metadata, the full library
//! listing (the party shuffle pool) and the storage identity come from a
//! catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CatalogError;
use crate::types::{TrackMetadata, TrackRef};

/// Library lookup used by the controller
pub trait TrackCatalog: Send {
    /// Resolve metadata for a track
    fn resolve(&self, track: TrackRef) -> Result<TrackMetadata, CatalogError>;

    /// Every playable track, in catalog order
    fn all_tracks(&self) -> Result<Vec<TrackRef>, CatalogError>;

    /// Token identifying the storage the library lives on
    ///
    /// A saved queue is only restored when this matches the token it was
    /// saved with.
    fn storage_identity(&self) -> Result<i64, CatalogError>;
}

/// One entry of a library file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LibraryEntry {
    id: u64,
    #[serde(flatten)]
    metadata: TrackMetadata,
}

/// Library file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    storage_identity: i64,
    tracks: Vec<LibraryEntry>,
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tracks: BTreeMap<TrackRef, TrackMetadata>,
    storage_identity: i64,
}

impl MemoryCatalog {
    /// Create an empty catalog on the given storage
    pub fn new(storage_identity: i64) -> Self {
        Self {
            tracks: BTreeMap::new(),
            storage_identity,
        }
    }

    /// Catalog of `count` generated tracks with ids `1..=count`
    pub fn synthetic(count: u64) -> Self {
        let mut catalog = Self::new(1);
        for id in 1..=count {
            catalog.insert(
                TrackRef(id),
                TrackMetadata {
                    title: format!("Track {}", id),
                    artist: format!("Artist {}", id % 7),
                    album: format!("Album {}", id % 13),
                    duration_ms: 120_000 + (id % 5) * 30_000,
                    is_favorite: false,
                },
            );
        }
        catalog
    }

    /// Load a JSON library file
    ///
    /// ```json
    /// { "storage_identity": 3,
    ///   "tracks": [ { "id": 1, "title": "…", "artist": "…", "album": "…", "duration_ms": 200000 } ] }
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let file: LibraryFile = serde_json::from_str(&contents)?;

        let mut catalog = Self::new(file.storage_identity);
        for entry in file.tracks {
            catalog.insert(TrackRef(entry.id), entry.metadata);
        }
        Ok(catalog)
    }

    /// Add or replace a track
    pub fn insert(&mut self, track: TrackRef, metadata: TrackMetadata) {
        self.tracks.insert(track, metadata);
    }

    /// Remove a track
    pub fn remove(&mut self, track: TrackRef) -> Option<TrackMetadata> {
        self.tracks.remove(&track)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackCatalog for MemoryCatalog {
    fn resolve(&self, track: TrackRef) -> Result<TrackMetadata, CatalogError> {
        self.tracks
            .get(&track)
            .cloned()
            .ok_or(CatalogError::NotFound(track.0))
    }

    fn all_tracks(&self) -> Result<Vec<TrackRef>, CatalogError> {
        Ok(self.tracks.keys().copied().collect())
    }

    fn storage_identity(&self) -> Result<i64, CatalogError> {
        Ok(self.storage_identity)
    }
}
