//! Configuration loading for the playback session controller
//!
//! Tunables ship with compiled defaults and can be overridden from a TOML
//! file. Resolution priority:
//! 1. Explicit path handed in by the embedder (highest priority)
//! 2. `PLAYDECK_CONFIG` environment variable
//! 3. Per-user config file (`<config dir>/playdeck/config.toml`)
//! 4. Compiled defaults (fallback)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable naming an override config file
pub const CONFIG_ENV_VAR: &str = "PLAYDECK_CONFIG";

/// Controller tunables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Minimum position delta accepted from engine ticks (seconds).
    /// Smaller movements are ignored to keep re-render churn down.
    #[serde(default = "default_position_hysteresis")]
    pub position_hysteresis: f64,

    /// Interval of the store/engine playback state self-check (milliseconds)
    #[serde(default = "default_drift_check_interval_ms")]
    pub drift_check_interval_ms: u64,

    /// Interval of the outbound sync queue flush timer (milliseconds)
    #[serde(default = "default_sync_flush_interval_ms")]
    pub sync_flush_interval_ms: u64,

    /// Maximum outbound commands held between flushes; overflow drops the
    /// oldest entry
    #[serde(default = "default_sync_queue_capacity")]
    pub sync_queue_capacity: usize,

    /// Event bus channel capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Volume applied before any stored preference arrives (0.0-1.0)
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Pre-rendered waveform peak rate, used for the duration estimate
    /// fallback (peaks per second of audio)
    #[serde(default = "default_peaks_per_second")]
    pub peaks_per_second: f64,
}

fn default_position_hysteresis() -> f64 {
    0.5
}

fn default_drift_check_interval_ms() -> u64 {
    1000
}

fn default_sync_flush_interval_ms() -> u64 {
    250
}

fn default_sync_queue_capacity() -> usize {
    32
}

fn default_event_bus_capacity() -> usize {
    128
}

fn default_volume() -> f32 {
    0.75
}

fn default_peaks_per_second() -> f64 {
    10.0
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position_hysteresis: default_position_hysteresis(),
            drift_check_interval_ms: default_drift_check_interval_ms(),
            sync_flush_interval_ms: default_sync_flush_interval_ms(),
            sync_queue_capacity: default_sync_queue_capacity(),
            event_bus_capacity: default_event_bus_capacity(),
            default_volume: default_volume(),
            peaks_per_second: default_peaks_per_second(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration following the priority order.
    ///
    /// A missing file at a lower priority falls through to the next source;
    /// a file that exists but fails to parse is an error, since silently
    /// running with defaults would mask the typo.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit path from the embedder
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: per-user config file
        if let Some(path) = user_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Priority 4: compiled defaults
        debug!("no config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Load and parse a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!("loading config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        Ok(config.sanitized())
    }

    /// Clamp out-of-range values back to usable ones, logging each fix
    fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.default_volume) {
            warn!(
                "default_volume {} out of range, clamping",
                self.default_volume
            );
            self.default_volume = self.default_volume.clamp(0.0, 1.0);
        }
        if self.position_hysteresis < 0.0 || !self.position_hysteresis.is_finite() {
            warn!(
                "position_hysteresis {} invalid, using default",
                self.position_hysteresis
            );
            self.position_hysteresis = default_position_hysteresis();
        }
        if self.sync_queue_capacity == 0 {
            warn!("sync_queue_capacity 0 invalid, using default");
            self.sync_queue_capacity = default_sync_queue_capacity();
        }
        if self.event_bus_capacity == 0 {
            warn!("event_bus_capacity 0 invalid, using default");
            self.event_bus_capacity = default_event_bus_capacity();
        }
        self
    }

    pub fn drift_check_interval(&self) -> Duration {
        Duration::from_millis(self.drift_check_interval_ms)
    }

    pub fn sync_flush_interval(&self) -> Duration {
        Duration::from_millis(self.sync_flush_interval_ms)
    }
}

/// Per-user config file location (`<config dir>/playdeck/config.toml`)
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playdeck").join("config.toml"))
}
