//! Session lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a session
///
/// Only the session actor mutates it; everything else observes it through
/// `SessionHandle::state` or the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl SessionState {
    /// A connection attempt is in flight or established
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connecting => "CONNECTING",
            SessionState::Connected => "CONNECTED",
            SessionState::Error => "ERROR",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
