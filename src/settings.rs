//! Runtime tunables
//!
//! Settings cover timings that are not user-editable from the console:
//! sampler period and window, the live connect timeout, event buffering and
//! the simulated peer's protocol delays. They load from YAML; every field is
//! optional and falls back to the reference behavior.
//!
//! ```yaml
//! metrics_period_ms: 1000
//! connect_timeout_ms: 5000
//! peer:
//!   broadcast_chance: 0.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{ConsoleError, Result};

/// Session-wide tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Traffic sampler bucket width
    pub metrics_period_ms: u64,

    /// Number of samples kept
    pub metrics_window: usize,

    /// Bound on a live connection attempt; 0 waits forever
    pub connect_timeout_ms: u64,

    /// Buffered session events per subscriber
    pub event_capacity: usize,

    /// Simulated peer timings
    pub peer: PeerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            metrics_period_ms: 1_000,
            metrics_window: crate::metrics::DEFAULT_WINDOW,
            connect_timeout_ms: 10_000,
            event_capacity: 1_024,
            peer: PeerSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ConsoleError::parse_error("Settings YAML", e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "Loaded settings file");
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics_period_ms == 0 {
            return Err(ConsoleError::invalid_config("metrics_period_ms must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(ConsoleError::invalid_config("event_capacity must be greater than zero"));
        }
        self.peer.validate()
    }

    pub fn metrics_period(&self) -> Duration {
        Duration::from_millis(self.metrics_period_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

/// Protocol timings of the simulated peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSettings {
    /// Delay before the SYSTEM welcome after attach
    pub welcome_delay_ms: u64,

    /// Period of the random broadcast roll
    pub broadcast_period_ms: u64,

    /// Probability that a roll emits a broadcast (0.0 disables broadcasts)
    pub broadcast_chance: f64,

    pub pong_delay_ms: u64,
    pub auth_delay_ms: u64,
    pub echo_delay_ms: u64,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            welcome_delay_ms: 500,
            broadcast_period_ms: 5_000,
            broadcast_chance: 0.3,
            pong_delay_ms: 100,
            auth_delay_ms: 300,
            echo_delay_ms: 200,
        }
    }
}

impl PeerSettings {
    /// Reference timings without random broadcasts
    pub fn quiet() -> Self {
        Self { broadcast_chance: 0.0, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.broadcast_chance) {
            return Err(ConsoleError::invalid_config("peer.broadcast_chance must be within 0..=1"));
        }
        if self.broadcast_period_ms == 0 && self.broadcast_chance > 0.0 {
            return Err(ConsoleError::invalid_config(
                "peer.broadcast_period_ms must be greater than zero when broadcasts are enabled",
            ));
        }
        Ok(())
    }

    pub fn welcome_delay(&self) -> Duration {
        Duration::from_millis(self.welcome_delay_ms)
    }

    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(self.broadcast_period_ms)
    }

    pub fn pong_delay(&self) -> Duration {
        Duration::from_millis(self.pong_delay_ms)
    }

    pub fn auth_delay(&self) -> Duration {
        Duration::from_millis(self.auth_delay_ms)
    }

    pub fn echo_delay(&self) -> Duration {
        Duration::from_millis(self.echo_delay_ms)
    }
}
