//! Error types for the console core.
//!
//! Most failures in NetPulse never reach the caller: a transport that cannot
//! open falls back to the simulated peer, a malformed payload is logged as
//! text, and a broken store falls back to defaults. The errors below are the
//! ones that are returned from the public API.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: A live endpoint could not be opened
//! - **Transport Errors**: An open transport rejected an outbound frame
//! - **Parse Errors**: Payload formatting or settings decoding failed
//! - **Storage Errors**: The key-value store could not load or save a value
//! - **Validation Errors**: Invalid configuration, presets or stress plans
//! - **Session Errors**: The session actor is no longer running
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use netpulse::ConsoleError;
//!
//! let error = ConsoleError::connection_failed("ws://localhost:8080/ws refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for console operations.
pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;

/// Main error type for console operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConsoleError {
    #[error("Failed to open endpoint: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Storage error for key '{key}': {details}")]
    Storage { key: String, details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid preset: {reason}")]
    InvalidPreset { reason: String },

    #[error("Preset '{id}' not found")]
    PresetNotFound { id: String },

    #[error("Session is no longer running")]
    SessionClosed,
}

impl ConsoleError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConsoleError::Connection { .. } => true,
            ConsoleError::Timeout { .. } => true,
            ConsoleError::Transport { .. } => true,
            ConsoleError::Storage { .. } => true,
            ConsoleError::File { .. } => false,
            ConsoleError::Parse { .. } => false,
            ConsoleError::InvalidConfig { .. } => false,
            ConsoleError::InvalidPreset { .. } => false,
            ConsoleError::PresetNotFound { .. } => false,
            ConsoleError::SessionClosed => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ConsoleError::Connection { .. } => vec![
                "Check that the endpoint address is reachable",
                "Verify the ws:// or wss:// scheme",
                "Use a mock address to exercise the simulated peer",
            ],
            ConsoleError::Timeout { .. } => vec![
                "Increase connect_timeout_ms in the settings",
                "Check that the server completes the WebSocket handshake",
            ],
            ConsoleError::Transport { .. } => vec![
                "Reconnect the session",
                "Check the server logs for a closed connection",
            ],
            ConsoleError::Parse { .. } => vec![
                "Check the payload matches the selected mode",
                "Validate JSON or XML syntax before formatting",
            ],
            ConsoleError::Storage { .. } => vec![
                "Check the storage directory is writable",
                "Remove the corrupted entry to restore defaults",
            ],
            ConsoleError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            ConsoleError::InvalidConfig { .. } => vec![
                "Use a heartbeat interval greater than zero",
                "Provide a non-empty endpoint address",
            ],
            ConsoleError::InvalidPreset { .. } => vec![
                "Give the preset a name and a payload",
                "Use JSON, TEXT, XML or BINARY as the preset kind",
            ],
            ConsoleError::PresetNotFound { .. } => vec!["Reload the preset list"],
            ConsoleError::SessionClosed => vec!["Spawn a new session"],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ConsoleError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ConsoleError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ConsoleError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for storage errors.
    pub fn storage_error(key: impl Into<String>, details: impl Into<String>) -> Self {
        ConsoleError::Storage { key: key.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ConsoleError::File { path, source }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        ConsoleError::InvalidConfig { reason: reason.into() }
    }

    /// Helper constructor for preset validation errors.
    pub fn invalid_preset(reason: impl Into<String>) -> Self {
        ConsoleError::InvalidPreset { reason: reason.into() }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConsoleError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConsoleError::Transport { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            key in "[a-z.]+",
            details in ".*",
            duration_ms in 1u64..60000u64
          ) {
            let connection = ConsoleError::connection_failed(reason.clone());
            let storage = ConsoleError::storage_error(key.clone(), details.clone());
            let timeout = ConsoleError::Timeout { duration: Duration::from_millis(duration_ms) };

            prop_assert!(connection.to_string().contains(&reason));
            let storage_msg = storage.to_string();
            prop_assert!(storage_msg.contains(&key));
            prop_assert!(storage_msg.contains(&details));
            prop_assert!(!timeout.to_string().is_empty());
          }

          #[test]
          fn source_chain_preserves_the_root_cause(base_message in ".+") {
            let root: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let top = ConsoleError::connection_failed_with_source("handshake", root);

            let source = std::error::Error::source(&top);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ConsoleError>();

        let error = ConsoleError::SessionClosed;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(ConsoleError::connection_failed("refused").is_retryable());
        assert!(ConsoleError::Timeout { duration: Duration::from_secs(1) }.is_retryable());
        assert!(!ConsoleError::invalid_config("zero interval").is_retryable());
        assert!(!ConsoleError::SessionClosed.is_retryable());
    }

    #[test]
    fn every_error_has_suggestions() {
        let errors = [
            ConsoleError::connection_failed("x"),
            ConsoleError::Timeout { duration: Duration::from_secs(1) },
            ConsoleError::parse_error("json", "eof"),
            ConsoleError::storage_error("k", "locked"),
            ConsoleError::invalid_config("x"),
            ConsoleError::invalid_preset("x"),
            ConsoleError::PresetNotFound { id: "1".to_string() },
            ConsoleError::SessionClosed,
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_errors_convert_to_file_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "settings.yaml");
        let err: ConsoleError = io_err.into();
        match err {
            ConsoleError::File { source, .. } => assert_eq!(source.to_string(), "settings.yaml"),
            other => panic!("Expected File error variant, got {other:?}"),
        }
    }
}
