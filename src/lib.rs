//! Session, framing and simulated-peer core for a WebSocket testing console.
//!
//! NetPulse owns everything between the composer and the socket: the
//! connection lifecycle, classification of every payload into a frame kind,
//! an append-only message log, periodic heartbeats, traffic sampling, saved
//! presets and stress runs. When no live endpoint is reachable it substitutes
//! an in-process simulated peer that speaks the same envelope protocol.
//!
//! # Features
//!
//! - **Single-owner session**: one actor task serializes every state change
//! - **Transport boundary**: tokio-tungstenite client or simulated peer, same trait
//! - **Explicit fallback**: placeholder addresses go straight to the simulated
//!   peer; a failed or timed-out live open falls back exactly once
//! - **Presentation hooks**: event broadcast, state watch and coalesced render ticks
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use netpulse::{FrameKind, NetPulse};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> netpulse::Result<()> {
//!     let session = NetPulse::connect("ws://mock/demo").await?;
//!     session.send(FrameKind::Json, r#"{"type":"PING"}"#).await?;
//!
//!     let mut states = Box::pin(session.state_changes());
//!     while let Some(state) = states.next().await {
//!         println!("state: {state}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Payload handling
pub mod classifier;
pub mod envelope;
mod format;

// Session architecture
pub mod clock;
pub mod driver;
pub mod log;
pub mod metrics;
pub mod session;
pub mod stream;
pub mod stress;
pub mod transport;

// Persistence and tunables
pub mod persistence;
pub mod presets;
pub mod settings;

// Core exports
pub use error::*;
pub use types::*;

pub use classifier::{classify, classify_with_hint};
pub use format::{pretty_json, pretty_xml};
pub use log::{LogQuery, MessageLog};
pub use metrics::{MetricWindow, TrafficSampler};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use presets::{Preset, PresetBook, PresetId};
pub use session::{SendOutcome, SessionBuilder, SessionEvent, SessionHandle};
pub use settings::{PeerSettings, Settings};
pub use stress::{StressPlan, StressProgress, StressRun};
pub use transport::{Connector, SimulatedPeer, Transport, TransportEvent, WsConnector};

/// Unified entry point for NetPulse sessions.
///
/// # Examples
///
/// ## Simulated peer
/// ```rust,no_run
/// use netpulse::NetPulse;
///
/// #[tokio::main]
/// async fn main() -> netpulse::Result<()> {
///     let session = NetPulse::connect("ws://mock/local").await?;
///     // Use session...
///     Ok(())
/// }
/// ```
///
/// ## Custom collaborators
/// ```rust,no_run
/// use netpulse::{FileStore, NetPulse, Settings};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> netpulse::Result<()> {
///     let session = NetPulse::builder()
///         .settings(Settings::load("netpulse.yaml")?)
///         .store(Arc::new(FileStore::open(".netpulse")?))
///         .spawn()?;
///     session.connect().await?;
///     Ok(())
/// }
/// ```
pub struct NetPulse;

impl NetPulse {
    /// Builder with the WebSocket connector, an in-memory store and the system clock
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Spawn a session for `url` and start connecting.
    ///
    /// Returns once the connection attempt has started; a placeholder
    /// address (containing `mock`) is already CONNECTED by then, a live one
    /// reports its outcome through [`SessionHandle::state_changes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty.
    pub async fn connect(url: impl Into<String>) -> Result<SessionHandle> {
        let session = SessionBuilder::new().config(SessionConfig::new(url)).spawn()?;
        session.connect().await?;
        Ok(session)
    }
}
