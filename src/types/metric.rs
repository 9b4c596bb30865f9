//! Traffic metric samples

use serde::{Deserialize, Serialize};

/// One fixed-width traffic bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct MetricSample {
    /// End of the bucket in milliseconds since the Unix epoch
    pub at_ms: i64,

    /// Frames received during the bucket
    pub inbound: u32,

    /// Frames sent during the bucket
    pub outbound: u32,

    /// Synthetic latency figure for display
    pub latency_ms: u32,
}

impl MetricSample {
    pub fn total(&self) -> u32 {
        self.inbound + self.outbound
    }
}
