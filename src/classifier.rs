//! Payload classification
//!
//! Every inbound payload is tagged with a [`FrameKind`] before it reaches the
//! message log. Classification is a pure function of the text:
//!
//! - Text that does not start with `{` or `[` (after trimming) is `TEXT`
//! - Text that looks structured but fails to parse is also `TEXT`, never `ERROR`
//! - Parsed JSON whose `type` discriminator is `SYSTEM` or `AUTH` takes that kind
//! - Any other parsed JSON is `JSON`
//!
//! `XML` and `BINARY` are never inferred; they only appear when the sender
//! picked that mode in the composer (see [`classify_with_hint`]).

use serde_json::Value;

use crate::envelope::{self, EnvelopeType};
use crate::types::FrameKind;

/// Outcome of the single structural parse attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    /// Does not look like JSON
    Unstructured,

    /// Starts like JSON but does not parse
    Malformed,

    /// Parsed JSON value
    Parsed(Value),
}

/// Attempt to parse a payload as JSON exactly once
pub fn inspect(raw: &str) -> Structure {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Structure::Unstructured;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Structure::Parsed(value),
        Err(_) => Structure::Malformed,
    }
}

/// Classify a raw payload
pub fn classify(raw: &str) -> FrameKind {
    match inspect(raw) {
        Structure::Unstructured | Structure::Malformed => FrameKind::Text,
        Structure::Parsed(value) => match envelope::discriminator(&value) {
            Some(EnvelopeType::System) => FrameKind::System,
            Some(EnvelopeType::Auth) => FrameKind::Auth,
            _ => FrameKind::Json,
        },
    }
}

/// Classify with the sender's explicit composer mode
///
/// An `XML` or `BINARY` hint is authoritative; any other hint is ignored and
/// the payload is classified from its content.
pub fn classify_with_hint(raw: &str, hint: Option<FrameKind>) -> FrameKind {
    match hint {
        Some(kind @ (FrameKind::Xml | FrameKind::Binary)) => kind,
        _ => classify(raw),
    }
}

/// Translate an envelope received from the simulated peer
///
/// `SYSTEM`, `AUTH` and `PONG` discriminators map straight to their frame
/// kinds; everything else goes through [`classify`]. The display text is the
/// envelope's string `content` when present.
pub(crate) fn translate_envelope(raw: &str) -> (FrameKind, String) {
    let value = match inspect(raw) {
        Structure::Parsed(value) => value,
        Structure::Unstructured | Structure::Malformed => return (FrameKind::Text, raw.to_string()),
    };
    let kind = match envelope::discriminator(&value) {
        Some(EnvelopeType::System) => FrameKind::System,
        Some(EnvelopeType::Auth) => FrameKind::Auth,
        Some(EnvelopeType::Pong) => FrameKind::HeartbeatPong,
        _ => classify(raw),
    };
    (kind, envelope::content_text(&value, raw))
}
