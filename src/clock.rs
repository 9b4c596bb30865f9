//! Wall-clock source for frame and sample timestamps
//!
//! Timers run on tokio time; only the timestamps written into frames and
//! samples come from a [`Clock`], so tests can pin them.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of capture timestamps
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default()
    }
}
