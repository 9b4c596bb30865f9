//! Core types shared by the session, the log and the presentation layer.
//!
//! ## Architecture
//!
//! - [`Frame`] is one logged message: immutable, shared as `Arc<Frame>`
//! - [`FrameKind`] is the classification tag; serialized with the console's
//!   wire labels (`PING`, `PONG`, `JSON`, ...)
//! - [`SessionState`] is the single authoritative lifecycle value
//! - [`SessionConfig`] holds the user-editable connection settings
//! - [`MetricSample`] is one traffic bucket of the rate sampler
//! - [`RefreshRate`] controls how render notifications are coalesced
//!
//! ## Usage Example
//!
//! ```rust
//! use netpulse::types::{Direction, FrameDraft, FrameKind};
//! use netpulse::MessageLog;
//!
//! let mut log = MessageLog::new();
//! let frame = log.append(FrameDraft::outbound(FrameKind::Json, r#"{"op":"hello"}"#), 1_000);
//!
//! assert_eq!(frame.direction, Direction::Outbound);
//! assert_eq!(frame.created_at_ms, 1_000);
//! ```

mod config;
mod frame;
mod metric;
mod refresh_rate;
mod state;

// Re-export all public types
pub use config::{HeartbeatConfig, SessionConfig, credential_prefix};
pub use frame::{Direction, Draft, Frame, FrameDraft, FrameId, FrameKind};
pub use metric::MetricSample;
pub use refresh_rate::RefreshRate;
pub use state::SessionState;
