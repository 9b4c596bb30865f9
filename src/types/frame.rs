//! Frame types for the message log

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque frame identifier assigned by the message log
///
/// Identifiers increase monotonically and are never reused, even after the
/// log is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classification tag attached to every frame
///
/// Serialized labels follow the console's wire names, so heartbeat frames
/// appear as `PING` / `PONG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum FrameKind {
    #[serde(rename = "AUTH")]
    Auth,
    #[serde(rename = "PING")]
    HeartbeatPing,
    #[serde(rename = "PONG")]
    HeartbeatPong,
    #[serde(rename = "SYSTEM")]
    System,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "XML")]
    Xml,
    #[serde(rename = "BINARY")]
    Binary,
}

impl FrameKind {
    /// Every kind, in display order
    pub const ALL: [FrameKind; 9] = [
        FrameKind::Auth,
        FrameKind::HeartbeatPing,
        FrameKind::HeartbeatPong,
        FrameKind::System,
        FrameKind::Error,
        FrameKind::Json,
        FrameKind::Text,
        FrameKind::Xml,
        FrameKind::Binary,
    ];

    /// Wire label for this kind
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Auth => "AUTH",
            FrameKind::HeartbeatPing => "PING",
            FrameKind::HeartbeatPong => "PONG",
            FrameKind::System => "SYSTEM",
            FrameKind::Error => "ERROR",
            FrameKind::Json => "JSON",
            FrameKind::Text => "TEXT",
            FrameKind::Xml => "XML",
            FrameKind::Binary => "BINARY",
        }
    }

    /// Whether a user can compose an outbound draft of this kind
    pub fn is_composable(self) -> bool {
        matches!(self, FrameKind::Json | FrameKind::Text | FrameKind::Xml | FrameKind::Binary)
    }

    /// Control kinds describe the session itself rather than user data
    pub fn is_control(self) -> bool {
        !self.is_composable()
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which way a frame travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Direction {
    #[serde(rename = "OUTBOUND")]
    Outbound,
    #[serde(rename = "INBOUND")]
    Inbound,
}

impl Direction {
    pub fn is_outbound(self) -> bool {
        self == Direction::Outbound
    }
}

/// One logged, classified, directional message
///
/// Frames are shared as `Arc<Frame>` once appended and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Frame {
    /// Log-assigned identifier
    pub id: FrameId,

    /// Classification, fixed at creation
    pub kind: FrameKind,

    /// Raw text content
    pub payload: String,

    /// Direction, fixed at creation
    pub direction: Direction,

    /// Capture time in milliseconds since the Unix epoch
    pub created_at_ms: i64,
}

/// A frame that has not been appended yet
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDraft {
    pub kind: FrameKind,
    pub payload: String,
    pub direction: Direction,

    /// Capture time, when the producer already knows it
    pub created_at_ms: Option<i64>,
}

impl FrameDraft {
    pub fn outbound(kind: FrameKind, payload: impl Into<String>) -> Self {
        Self { kind, payload: payload.into(), direction: Direction::Outbound, created_at_ms: None }
    }

    pub fn inbound(kind: FrameKind, payload: impl Into<String>) -> Self {
        Self { kind, payload: payload.into(), direction: Direction::Inbound, created_at_ms: None }
    }

    /// Pin the capture time instead of letting the log stamp it
    pub fn captured_at(mut self, created_at_ms: i64) -> Self {
        self.created_at_ms = Some(created_at_ms);
        self
    }
}

/// Composer content: what the user is about to send
///
/// Applying a preset copies its kind and payload into a new draft; the draft
/// does not track later edits to the preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Draft {
    pub kind: FrameKind,
    pub payload: String,
}

impl Draft {
    pub fn new(kind: FrameKind, payload: impl Into<String>) -> Self {
        Self { kind, payload: payload.into() }
    }

    pub fn json(payload: impl Into<String>) -> Self {
        Self::new(FrameKind::Json, payload)
    }

    pub fn text(payload: impl Into<String>) -> Self {
        Self::new(FrameKind::Text, payload)
    }

    /// A draft with only whitespace is never sent
    pub fn is_blank(&self) -> bool {
        self.payload.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_with_wire_labels() {
        for kind in FrameKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
            let back: FrameKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn only_user_data_kinds_are_composable() {
        let composable: Vec<_> = FrameKind::ALL.into_iter().filter(|k| k.is_composable()).collect();
        assert_eq!(
            composable,
            vec![FrameKind::Json, FrameKind::Text, FrameKind::Xml, FrameKind::Binary]
        );
        assert!(FrameKind::HeartbeatPing.is_control());
    }

    #[test]
    fn draft_blankness_ignores_whitespace() {
        assert!(Draft::text("  \n\t").is_blank());
        assert!(!Draft::json("{}").is_blank());
    }
}
