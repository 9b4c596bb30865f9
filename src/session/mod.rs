//! Connection session
//!
//! A session owns one link at a time, the lifecycle state, the message log,
//! the heartbeat timer and the traffic sampler. All of it lives inside a
//! single actor task; callers talk to it through a cloneable
//! [`SessionHandle`]. Every mutating call is answered after the actor has
//! applied it, so a frame produced by `send` is already in the log when the
//! call returns.
//!
//! ```rust,no_run
//! use netpulse::{FrameKind, SessionBuilder, SessionConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> netpulse::Result<()> {
//! let session = SessionBuilder::new()
//!     .config(SessionConfig::new("ws://mock/echo").with_token("abc123"))
//!     .spawn()?;
//!
//! session.connect().await?;
//! session.send(FrameKind::Json, r#"{"type":"MESSAGE","content":"hi"}"#).await?;
//! # Ok(())
//! # }
//! ```

mod actor;

use futures::stream::{BoxStream, Stream, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::log::LogQuery;
use crate::persistence::{self, KeyValueStore, MemoryStore, keys};
use crate::settings::Settings;
use crate::stream::ThrottleExt;
use crate::stress::{StressPlan, StressRun};
use crate::transport::{Connector, WsConnector};
use crate::types::{Frame, FrameId, FrameKind, MetricSample, RefreshRate, SessionConfig, SessionState};
use crate::{ConsoleError, Result};

use actor::{Actor, Collaborators, Outputs};

const COMMAND_CAPACITY: usize = 64;

/// Result of [`SessionHandle::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Transmitted and logged as the returned frame
    Sent(FrameId),

    /// The session is CONNECTED but its link cannot carry frames; an ERROR
    /// frame was logged
    Failed,

    /// Not connected; nothing happened
    Ignored,
}

impl SendOutcome {
    pub fn is_sent(self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

/// Notification of a session mutation
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged { from: SessionState, to: SessionState },
    FrameAppended(Arc<Frame>),
    LogCleared { removed: usize },
    Sample(MetricSample),
    ConfigChanged(SessionConfig),
}

pub(crate) enum Command {
    Connect { config: Option<SessionConfig>, reply: oneshot::Sender<Result<()>> },
    Disconnect { reply: oneshot::Sender<()> },
    Send { kind: FrameKind, payload: String, reply: oneshot::Sender<SendOutcome> },
    Configure { config: SessionConfig, reply: oneshot::Sender<Result<()>> },
    Config { reply: oneshot::Sender<SessionConfig> },
    Frames { reply: oneshot::Sender<Vec<Arc<Frame>>> },
    Search { query: LogQuery, reply: oneshot::Sender<Vec<Arc<Frame>>> },
    ClearLog { reply: oneshot::Sender<usize> },
    Metrics { reply: oneshot::Sender<Vec<MetricSample>> },
}

/// Configures and spawns a session actor
pub struct SessionBuilder {
    config: Option<SessionConfig>,
    settings: Settings,
    connector: Arc<dyn Connector>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// WebSocket connector, in-memory store, system clock
    pub fn new() -> Self {
        Self {
            config: None,
            settings: Settings::default(),
            connector: Arc::new(WsConnector),
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(SystemClock),
            seed: None,
        }
    }

    /// Start from this configuration instead of the stored one
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Seed the session RNG (simulated peer rolls and synthetic latency)
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spawn the actor on the current tokio runtime
    pub fn spawn(self) -> Result<SessionHandle> {
        self.settings.validate()?;

        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => {
                let stored = persistence::load_or(self.store.as_ref(), keys::CONFIG, SessionConfig::default());
                match stored.validate() {
                    Ok(()) => stored,
                    Err(e) => {
                        warn!(error = %e, "Stored configuration rejected, using defaults");
                        SessionConfig::default()
                    }
                }
            }
        };

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (revision_tx, revision_rx) = watch::channel(0u64);
        let (events_tx, _) = broadcast::channel(self.settings.event_capacity);
        let cancel = CancellationToken::new();

        info!(url = %config.url, "Spawning session");
        let actor = Actor::new(
            config,
            self.settings,
            Collaborators { connector: self.connector, store: self.store, clock: self.clock },
            rng,
            Outputs { state: state_tx, revision: revision_tx, events: events_tx.clone() },
        );
        tokio::spawn(actor.run(command_rx, cancel.clone()));

        Ok(SessionHandle {
            commands: command_tx,
            state: state_rx,
            revision: revision_rx,
            events: events_tx,
            _guard: Arc::new(cancel.drop_guard()),
        })
    }
}

/// Cloneable handle to a running session
///
/// The actor stops, and its link is torn down, when the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
    revision: watch::Receiver<u64>,
    events: broadcast::Sender<SessionEvent>,
    _guard: Arc<DropGuard>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands.send(build(reply)).await.map_err(|_| ConsoleError::SessionClosed)?;
        response.await.map_err(|_| ConsoleError::SessionClosed)
    }

    /// Connect with the current configuration
    pub async fn connect(&self) -> Result<()> {
        self.request(|reply| Command::Connect { config: None, reply }).await?
    }

    /// Store `config`, then connect with it
    pub async fn connect_with(&self, config: SessionConfig) -> Result<()> {
        self.request(|reply| Command::Connect { config: Some(config), reply }).await?
    }

    /// Tear the link down; the state is DISCONNECTED when this returns
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    pub async fn send(&self, kind: FrameKind, payload: impl Into<String>) -> Result<SendOutcome> {
        let payload = payload.into();
        self.request(|reply| Command::Send { kind, payload, reply }).await
    }

    /// Validate, store and persist a new configuration
    ///
    /// Heartbeat changes apply immediately; endpoint and credential changes
    /// are picked up by the next `connect`.
    pub async fn configure(&self, config: SessionConfig) -> Result<()> {
        self.request(|reply| Command::Configure { config, reply }).await?
    }

    pub async fn config(&self) -> Result<SessionConfig> {
        self.request(|reply| Command::Config { reply }).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Current state, then every change
    pub fn state_changes(&self) -> impl Stream<Item = SessionState> + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Every mutation from now on
    ///
    /// A subscriber that falls more than `event_capacity` events behind skips
    /// the missed ones.
    pub fn events(&self) -> impl Stream<Item = SessionEvent> + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| async move {
            match event {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event subscriber lagged");
                    None
                }
            }
        })
    }

    /// Revision counter for re-rendering, coalesced to `rate`
    pub fn render_ticks(&self, rate: RefreshRate) -> BoxStream<'static, u64> {
        let revisions = WatchStream::new(self.revision.clone());
        match rate.throttle_interval() {
            None => revisions.boxed(),
            Some(interval) => revisions.throttle(interval).boxed(),
        }
    }

    /// Snapshot of the log in insertion order
    pub async fn frames(&self) -> Result<Vec<Arc<Frame>>> {
        self.request(|reply| Command::Frames { reply }).await
    }

    pub async fn search(&self, query: LogQuery) -> Result<Vec<Arc<Frame>>> {
        self.request(|reply| Command::Search { query, reply }).await
    }

    /// Clear the log; returns how many frames were removed
    pub async fn clear_log(&self) -> Result<usize> {
        self.request(|reply| Command::ClearLog { reply }).await
    }

    /// Sample window, oldest first
    pub async fn metrics(&self) -> Result<Vec<MetricSample>> {
        self.request(|reply| Command::Metrics { reply }).await
    }

    /// Start a stress run against this session
    ///
    /// The run does not keep the session alive; it stops early when the
    /// last handle is dropped.
    pub fn stress(&self, plan: StressPlan) -> Result<StressRun> {
        StressRun::spawn(self.commands.clone(), plan)
    }
}
