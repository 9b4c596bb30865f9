//! Driver spawns and manages link pump tasks
//!
//! A link is one transport plus the task that owns it. The task pumps
//! outbound text into the transport and forwards everything the transport
//! reports back to the session, stamped with the link's epoch. The session
//! bumps the epoch whenever it replaces a link, so events from a link that
//! was already torn down are recognised and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::ConsoleError;
use crate::transport::{Connector, Transport, TransportEvent, TransportOrigin};

/// Generation counter of links within one session
pub type Epoch = u64;

/// Event forwarded from a link to its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub epoch: Epoch,
    pub kind: LinkEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// The transport is open and ready to carry frames
    Opened,

    /// The transport could not be opened (connect error or timeout)
    OpenFailed(String),

    /// Something happened on the open transport
    Inbound(TransportEvent),
}

/// Handle to a spawned link
///
/// Dropping it does not stop the task; [`Link::shutdown`] does.
#[derive(Debug)]
pub struct Link {
    pub epoch: Epoch,
    pub origin: TransportOrigin,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    ready: Arc<AtomicBool>,
}

impl Link {
    /// Whether the transport is open and has not reported a failure
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    pub fn mark_unready(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Queue text for transmission; false when the pump is gone
    pub fn transmit(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Cancel the pump; the transport is closed by the task
    pub fn shutdown(&self) {
        self.mark_unready();
        self.cancel.cancel();
    }
}

/// Driver spawns link pump tasks
pub struct Driver;

impl Driver {
    /// Spawn a link that first opens `address` through `connector`
    ///
    /// The attempt is bounded by `timeout` when one is given. Its outcome is
    /// reported as [`LinkEventKind::Opened`] or [`LinkEventKind::OpenFailed`].
    pub fn spawn_network(
        epoch: Epoch,
        connector: Arc<dyn Connector>,
        address: String,
        timeout: Option<Duration>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Link {
        let (link, outbound_rx, ready) = Self::link(epoch, TransportOrigin::Network);
        let cancel = link.cancel.clone();

        tokio::spawn(async move {
            let attempt = async {
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, connector.open(&address)).await
                    {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(_) => Err(ConsoleError::Timeout { duration: limit }.to_string()),
                    },
                    None => connector.open(&address).await.map_err(|e| e.to_string()),
                }
            };

            let opened = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(epoch, "Link cancelled while opening");
                    return;
                }
                opened = attempt => opened,
            };

            match opened {
                Ok(mut transport) => {
                    if cancel.is_cancelled() {
                        transport.close().await;
                        return;
                    }
                    ready.store(true, Ordering::Release);
                    let _ = events.send(LinkEvent { epoch, kind: LinkEventKind::Opened });
                    Self::pump(epoch, transport, outbound_rx, events, cancel, ready).await;
                }
                Err(reason) => {
                    warn!(epoch, url = %address, %reason, "Live endpoint unavailable");
                    if !cancel.is_cancelled() {
                        let _ = events.send(LinkEvent { epoch, kind: LinkEventKind::OpenFailed(reason) });
                    }
                }
            }
        });

        link
    }

    /// Spawn a link around an already-open transport
    pub fn spawn_attached(
        epoch: Epoch,
        origin: TransportOrigin,
        transport: Box<dyn Transport>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Link {
        let (link, outbound_rx, ready) = Self::link(epoch, origin);
        ready.store(true, Ordering::Release);
        let cancel = link.cancel.clone();

        tokio::spawn(Self::pump(epoch, transport, outbound_rx, events, cancel, ready));
        link
    }

    fn link(
        epoch: Epoch,
        origin: TransportOrigin,
    ) -> (Link, mpsc::UnboundedReceiver<String>, Arc<AtomicBool>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(false));
        let link = Link {
            epoch,
            origin,
            outbound,
            cancel: CancellationToken::new(),
            ready: Arc::clone(&ready),
        };
        (link, outbound_rx, ready)
    }

    /// Pump task: owns the transport until cancellation or a terminal event
    async fn pump(
        epoch: Epoch,
        mut transport: Box<dyn Transport>,
        mut outbound: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<LinkEvent>,
        cancel: CancellationToken,
        ready: Arc<AtomicBool>,
    ) {
        info!(epoch, "Link pump started");
        let mut forwarded = 0u64;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(epoch, "Link pump cancelled");
                    break;
                }
                text = outbound.recv() => {
                    let Some(text) = text else { break };
                    if let Err(e) = transport.send(text).await {
                        TransportEvent::Error(e.to_string())
                    } else {
                        continue;
                    }
                }
                event = transport.recv() => event,
            };

            if cancel.is_cancelled() {
                break;
            }

            let terminal = !matches!(event, TransportEvent::Message(_));
            if terminal {
                ready.store(false, Ordering::Release);
            }
            forwarded += 1;
            trace!(epoch, ?event, "Link event");

            if events.send(LinkEvent { epoch, kind: LinkEventKind::Inbound(event) }).is_err() {
                debug!(epoch, "Session dropped, stopping link");
                break;
            }
            if terminal {
                break;
            }
        }

        ready.store(false, Ordering::Release);
        transport.close().await;
        info!(epoch, forwarded, "Link pump ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingConnector, HangingConnector, ScriptedConnector};

    async fn next(events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
        events.recv().await.expect("link event")
    }

    #[tokio::test(start_paused = true)]
    async fn network_link_reports_open_then_messages() {
        let (connector, mut remote) = ScriptedConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Driver::spawn_network(3, Arc::new(connector), "ws://live".into(), None, tx);

        assert_eq!(next(&mut rx).await, LinkEvent { epoch: 3, kind: LinkEventKind::Opened });
        assert!(link.is_ready());

        assert!(link.transmit("hello".into()));
        assert_eq!(remote.sent().await.as_deref(), Some("hello"));

        remote.push("world");
        assert_eq!(
            next(&mut rx).await.kind,
            LinkEventKind::Inbound(TransportEvent::Message("world".into()))
        );

        remote.close();
        assert_eq!(next(&mut rx).await.kind, LinkEventKind::Inbound(TransportEvent::Closed));
        assert!(!link.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn open_failure_is_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Driver::spawn_network(1, Arc::new(FailingConnector), "ws://x".into(), None, tx);

        let event = next(&mut rx).await;
        assert!(matches!(event.kind, LinkEventKind::OpenFailed(_)));
        assert!(!link.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn open_is_bounded_by_timeout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _link = Driver::spawn_network(
            1,
            Arc::new(HangingConnector),
            "ws://x".into(),
            Some(Duration::from_secs(2)),
            tx,
        );

        match next(&mut rx).await.kind {
            LinkEventKind::OpenFailed(reason) => {
                assert_eq!(reason, ConsoleError::Timeout { duration: Duration::from_secs(2) }.to_string());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_transport_and_stops_forwarding() {
        let (connector, remote) = ScriptedConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Driver::spawn_network(1, Arc::new(connector), "ws://live".into(), None, tx);
        assert_eq!(next(&mut rx).await.kind, LinkEventKind::Opened);

        link.shutdown();
        assert!(!link.is_ready());
        remote.closed().await;

        remote.push("late");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_opening_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Driver::spawn_network(1, Arc::new(HangingConnector), "ws://x".into(), None, tx);
        link.shutdown();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
