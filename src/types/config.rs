//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConsoleError, Result};

/// Marker that selects the simulated peer when it appears in an address
const PLACEHOLDER_MARKER: &str = "mock";

/// Longest credential prefix ever echoed into the log
const CREDENTIAL_PREFIX_MAX: usize = 5;

/// User-editable connection settings
///
/// Changes are persisted by the session. The endpoint and credential are only
/// read by `connect`, so editing them never disturbs an open link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct SessionConfig {
    /// Endpoint address, e.g. `ws://localhost:8080/ws`
    pub url: String,

    /// Bearer credential sent as an AUTH envelope after connecting (empty = none)
    pub token: String,

    /// Periodic heartbeat settings
    pub heartbeat: HeartbeatConfig,

    /// Skip the live endpoint and attach the simulated peer directly
    pub use_simulated: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            token: String::new(),
            heartbeat: HeartbeatConfig::default(),
            use_simulated: false,
        }
    }
}

impl SessionConfig {
    /// Configuration for an address with default heartbeat settings
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn simulated(mut self) -> Self {
        self.use_simulated = true;
        self
    }

    /// Whether `connect` should go straight to the simulated peer
    pub fn prefers_simulation(&self) -> bool {
        self.use_simulated || self.url.to_ascii_lowercase().contains(PLACEHOLDER_MARKER)
    }

    pub fn has_credential(&self) -> bool {
        !self.token.is_empty()
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ConsoleError::invalid_config("endpoint address is empty"));
        }
        if self.heartbeat.interval_ms == 0 {
            return Err(ConsoleError::invalid_config("heartbeat interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Heartbeat timer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct HeartbeatConfig {
    pub enabled: bool,

    /// Period between heartbeats in milliseconds
    pub interval_ms: u64,

    /// Sent verbatim on every tick
    pub payload: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { enabled: true, interval_ms: 30_000, payload: r#"{"type":"PING"}"#.to_string() }
    }
}

impl HeartbeatConfig {
    /// Heartbeat at `interval`; intervals beyond `u64::MAX` milliseconds saturate
    pub fn every(interval: Duration) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self { interval_ms, ..Self::default() }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Whether switching from `self` to `other` requires rescheduling the timer
    pub(crate) fn schedule_differs(&self, other: &HeartbeatConfig) -> bool {
        self.enabled != other.enabled || self.interval_ms != other.interval_ms
    }
}

/// The part of a credential that may be shown in logs
///
/// At most five characters and at most half of the credential, so the full
/// secret is never revealed even for short tokens.
pub fn credential_prefix(token: &str) -> &str {
    let shown = CREDENTIAL_PREFIX_MAX.min(token.chars().count() / 2);
    match token.char_indices().nth(shown) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}
