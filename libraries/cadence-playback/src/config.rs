//! Controller configuration
//!
//! Defaults match the behavior the controller is tuned for. `load` layers an
//! optional TOML file and `CADENCE_*` environment variables on top.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PlaybackError, Result};
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Capacity of the played-positions and drawn-indices histories (default: 100)
    pub history_capacity: usize,

    /// Tracks party shuffle keeps queued ahead of the current one (default: 7)
    pub auto_lookahead: usize,

    /// Party shuffle trims the queue head once the position passes this (default: 10)
    pub auto_trim_threshold: usize,

    /// Tracks party shuffle keeps before the current one after trimming (default: 9)
    pub auto_keep_behind: usize,

    /// Forward retries when a track fails to open (default: 10)
    pub open_retry_limit: u32,

    /// "Play" this close to the end skips to the next track (default: 2000 ms)
    pub near_end_ms: u64,

    /// "Previous" restarts the track once it played this long (default: 3000 ms)
    pub restart_threshold_ms: u64,

    /// Release the engine after this long without playback (default: 60000 ms)
    pub idle_delay_ms: u64,

    /// Interval between volume ramp steps (default: 10 ms)
    pub fade_step_ms: u64,

    /// Volume added per fade-in step (default: 0.01)
    pub fade_in_step: f32,

    /// Volume removed per duck step (default: 0.05)
    pub duck_step: f32,

    /// Volume while ducked (default: 0.2)
    pub duck_floor: f32,

    /// Pending commands the worker queue holds (default: 64)
    pub command_capacity: usize,

    /// Fixed seed for shuffling, for reproducible sessions
    pub rng_seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            auto_lookahead: 7,
            auto_trim_threshold: 10,
            auto_keep_behind: 9,
            open_retry_limit: 10,
            near_end_ms: 2000,
            restart_threshold_ms: 3000,
            idle_delay_ms: 60_000,
            fade_step_ms: 10,
            fade_in_step: 0.01,
            duck_step: 0.05,
            duck_floor: 0.2,
            command_capacity: 64,
            rng_seed: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `CADENCE_` prefix, e.g.
    /// `CADENCE_IDLE_DELAY_MS=30000`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path).required(true));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(PlaybackError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.auto_lookahead == 0 {
            return Err(PlaybackError::Config(
                "auto_lookahead must be at least 1".to_string(),
            ));
        }
        if self.auto_keep_behind > self.auto_trim_threshold {
            return Err(PlaybackError::Config(
                "auto_keep_behind must not exceed auto_trim_threshold".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.duck_floor) {
            return Err(PlaybackError::Config(
                "duck_floor must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.fade_in_step <= 0.0 || self.duck_step <= 0.0 {
            return Err(PlaybackError::Config(
                "fade steps must be positive".to_string(),
            ));
        }
        if self.command_capacity == 0 {
            return Err(PlaybackError::Config(
                "command_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.auto_lookahead, 7);
        assert_eq!(config.auto_trim_threshold, 10);
        assert_eq!(config.auto_keep_behind, 9);
        assert_eq!(config.open_retry_limit, 10);
        assert_eq!(config.idle_delay_ms, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "idle_delay_ms = 5000").unwrap();
        writeln!(file, "rng_seed = 7").unwrap();

        let config = ControllerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.idle_delay_ms, 5000);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.auto_lookahead, 7);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ControllerConfig::load(Some(Path::new("/nonexistent/cadence.toml")));
        assert!(matches!(result, Err(PlaybackError::Config(_))));
    }

    #[test]
    fn rejects_keep_behind_above_threshold() {
        let config = ControllerConfig {
            auto_keep_behind: 12,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
