//! Envelope wire shape
//!
//! Envelopes are the small JSON objects exchanged between a session and the
//! simulated peer: a `type` discriminator plus `content`, and optionally a
//! `sender` or `token`. The discriminators are peer-protocol tokens and are
//! distinct from [`FrameKind`](crate::FrameKind).

use serde_json::{Value, json};
use std::fmt;

/// Discriminator of an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeType {
    Ping,
    Pong,
    Auth,
    System,
    Message,
    Broadcast,
    Other(String),
}

impl EnvelopeType {
    pub fn parse(token: &str) -> Self {
        match token {
            "PING" => EnvelopeType::Ping,
            "PONG" => EnvelopeType::Pong,
            "AUTH" => EnvelopeType::Auth,
            "SYSTEM" => EnvelopeType::System,
            "MESSAGE" => EnvelopeType::Message,
            "BROADCAST" => EnvelopeType::Broadcast,
            other => EnvelopeType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EnvelopeType::Ping => "PING",
            EnvelopeType::Pong => "PONG",
            EnvelopeType::Auth => "AUTH",
            EnvelopeType::System => "SYSTEM",
            EnvelopeType::Message => "MESSAGE",
            EnvelopeType::Broadcast => "BROADCAST",
            EnvelopeType::Other(other) => other,
        }
    }
}

impl fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the `type` discriminator of a parsed value
pub fn discriminator(value: &Value) -> Option<EnvelopeType> {
    value.get("type").and_then(Value::as_str).map(EnvelopeType::parse)
}

/// Display text of an envelope: its string `content`, else the raw text
pub fn content_text(value: &Value, raw: &str) -> String {
    match value.get("content") {
        Some(Value::String(content)) => content.clone(),
        _ => raw.to_string(),
    }
}

/// Encode a `{type, content}` envelope
pub fn encode(kind: EnvelopeType, content: &str) -> String {
    json!({ "type": kind.as_str(), "content": content }).to_string()
}

/// Encode the AUTH envelope a session sends after connecting
pub fn auth(token: &str) -> String {
    json!({ "type": EnvelopeType::Auth.as_str(), "token": token }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_roundtrips_known_tokens() {
        for token in ["PING", "PONG", "AUTH", "SYSTEM", "MESSAGE", "BROADCAST"] {
            assert_eq!(EnvelopeType::parse(token).as_str(), token);
        }
        assert_eq!(EnvelopeType::parse("CHAT"), EnvelopeType::Other("CHAT".to_string()));
    }

    #[test]
    fn content_text_falls_back_to_raw() {
        let raw = r#"{"type":"MESSAGE","content":{"n":1}}"#;
        let value: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(content_text(&value, raw), raw);

        let value = json!({"type": "SYSTEM", "content": "hello"});
        assert_eq!(content_text(&value, "ignored"), "hello");
    }

    #[test]
    fn auth_envelope_carries_token() {
        let value: Value = serde_json::from_str(&auth("abc123")).unwrap();
        assert_eq!(discriminator(&value), Some(EnvelopeType::Auth));
        assert_eq!(value["token"], "abc123");
    }
}
