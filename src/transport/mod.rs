//! Transport boundary
//!
//! A [`Connector`] opens a [`Transport`]; a transport carries text frames in
//! both directions. The session never knows which implementation it is
//! driving: the tokio-tungstenite client and the in-process
//! [`SimulatedPeer`] look the same from the link driver's side.

mod network;
mod simulated;

pub use network::{WsConnector, WsTransport};
pub use simulated::SimulatedPeer;

use crate::Result;

/// Something that happened on a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Inbound text frame
    Message(String),

    /// The remote side closed, or the stream ended
    Closed,

    /// The transport failed; no further events follow
    Error(String),
}

/// Which kind of transport backs a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOrigin {
    Network,
    Simulated,
}

/// An open, bidirectional text transport
///
/// Each method is called from a single link driver task, so implementations
/// need no internal synchronization.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Transmit one text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Wait for the next event
    ///
    /// Must be cancel-safe: the driver polls it inside `select!`.
    async fn recv(&mut self) -> TransportEvent;

    /// Close the transport; later calls are no-ops
    async fn close(&mut self);
}

/// Opens transports for an address
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, address: &str) -> Result<Box<dyn Transport>>;
}
