//! Test doubles for the transport, clock and store boundaries
//!
//! These fixtures let session tests script a live endpoint, pin capture
//! timestamps and simulate a broken key-value store.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::persistence::KeyValueStore;
use crate::transport::{Connector, Transport, TransportEvent};
use crate::{ConsoleError, Result};

/// Connector that hands out one scripted transport
///
/// A second `open` fails, which a test observes as a fallback to the
/// simulated peer.
pub struct ScriptedConnector {
    transport: Mutex<Option<ScriptedTransport>>,
}

impl ScriptedConnector {
    pub fn new() -> (Self, ScriptedRemote) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();

        let transport = ScriptedTransport { inbound: inbound_rx, sent: sent_tx, closed: closed.clone() };
        let remote = ScriptedRemote { inbound: inbound_tx, sent: sent_rx, closed };
        (Self { transport: Mutex::new(Some(transport)) }, remote)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, address: &str) -> Result<Box<dyn Transport>> {
        let transport = self.transport.lock().ok().and_then(|mut slot| slot.take());
        match transport {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(ConsoleError::connection_failed(format!("{address}: script exhausted"))),
        }
    }
}

/// Transport half driven by a [`ScriptedRemote`]
pub struct ScriptedTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<String>,
    closed: CancellationToken,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(ConsoleError::Transport { reason: "transport closed".into(), source: None });
        }
        let _ = self.sent.send(text);
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn close(&mut self) {
        self.closed.cancel();
    }
}

/// Remote end of a scripted transport
pub struct ScriptedRemote {
    inbound: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: CancellationToken,
}

impl ScriptedRemote {
    /// Deliver an inbound text frame
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.inbound.send(TransportEvent::Message(text.into()));
    }

    /// Close from the remote side
    pub fn close(&self) {
        let _ = self.inbound.send(TransportEvent::Closed);
    }

    /// Fail the transport
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.inbound.send(TransportEvent::Error(reason.into()));
    }

    /// Next frame the session transmitted
    pub async fn sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Frame transmitted so far, without waiting
    pub fn try_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Wait until the session closed the transport
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Connector whose endpoint always refuses
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingConnector;

#[async_trait::async_trait]
impl Connector for FailingConnector {
    async fn open(&self, address: &str) -> Result<Box<dyn Transport>> {
        Err(ConsoleError::connection_failed(format!("{address}: connection refused")))
    }
}

/// Connector whose handshake never completes
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingConnector;

#[async_trait::async_trait]
impl Connector for HangingConnector {
    async fn open(&self, _address: &str) -> Result<Box<dyn Transport>> {
        std::future::pending().await
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(now_ms: i64) -> Self {
        Self { now: Arc::new(AtomicI64::new(now_ms)) }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Store where every operation fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Err(ConsoleError::storage_error(key, "storage unavailable"))
    }

    fn save(&self, key: &str, _value: &str) -> Result<()> {
        Err(ConsoleError::storage_error(key, "storage unavailable"))
    }
}
