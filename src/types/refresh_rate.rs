//! Refresh rate control for presentation streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a presentation layer wants to be told to re-render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum RefreshRate {
    /// One notification per mutation
    EveryChange,

    /// Coalesced to at most this many notifications per second
    /// A rate of zero is treated as `EveryChange`
    Max(u32),
}

impl RefreshRate {
    /// Normalize degenerate rates
    pub fn normalize(self) -> Self {
        match self {
            RefreshRate::Max(0) => RefreshRate::EveryChange,
            other => other,
        }
    }

    /// Check if coalescing is needed
    pub fn needs_throttle(self) -> bool {
        matches!(self.normalize(), RefreshRate::Max(_))
    }

    /// Get the coalescing interval if needed
    pub fn throttle_interval(self) -> Option<Duration> {
        match self.normalize() {
            RefreshRate::EveryChange => None,
            RefreshRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
