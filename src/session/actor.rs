//! The session actor: single owner of all session state

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{Command, SendOutcome, SessionEvent};
use crate::Result;
use crate::classifier;
use crate::clock::Clock;
use crate::driver::{Driver, Epoch, Link, LinkEvent, LinkEventKind};
use crate::envelope;
use crate::log::MessageLog;
use crate::metrics::TrafficSampler;
use crate::persistence::{self, KeyValueStore, keys};
use crate::settings::Settings;
use crate::transport::{Connector, SimulatedPeer, TransportEvent, TransportOrigin};
use crate::types::{
    Frame, FrameDraft, FrameKind, SessionConfig, SessionState, credential_prefix,
};

/// Synthetic latency range shown next to traffic samples
const LATENCY_MS: std::ops::Range<u32> = 5..15;

pub(crate) const SEND_FAILED: &str = "Socket not open, message failed.";

pub(super) struct Collaborators {
    pub connector: Arc<dyn Connector>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

pub(super) struct Outputs {
    pub state: watch::Sender<SessionState>,
    pub revision: watch::Sender<u64>,
    pub events: broadcast::Sender<SessionEvent>,
}

pub(super) struct Actor {
    config: SessionConfig,
    settings: Settings,
    state: SessionState,
    log: MessageLog,
    sampler: TrafficSampler,
    link: Option<Link>,
    epoch: Epoch,
    heartbeat: Option<Interval>,
    rng: StdRng,
    deps: Collaborators,
    outputs: Outputs,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: Option<mpsc::UnboundedReceiver<LinkEvent>>,
}

enum Step {
    Stop,
    Command(Command),
    Link(LinkEvent),
    Heartbeat,
    Sample,
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn delayed_interval(period: std::time::Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl Actor {
    pub(super) fn new(
        config: SessionConfig,
        settings: Settings,
        deps: Collaborators,
        rng: StdRng,
        outputs: Outputs,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        Self {
            sampler: TrafficSampler::new(settings.metrics_window),
            config,
            settings,
            state: SessionState::Disconnected,
            log: MessageLog::new(),
            link: None,
            epoch: 0,
            heartbeat: None,
            rng,
            deps,
            outputs,
            link_tx,
            link_rx: Some(link_rx),
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
        let Some(mut link_rx) = self.link_rx.take() else {
            return;
        };
        let mut sample_ticker = delayed_interval(self.settings.metrics_period());
        info!("Session actor started");

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Stop,
                command = commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Stop,
                },
                Some(event) = link_rx.recv() => Step::Link(event),
                _ = heartbeat_tick(&mut self.heartbeat) => Step::Heartbeat,
                _ = sample_ticker.tick() => Step::Sample,
            };

            match step {
                Step::Stop => break,
                Step::Command(command) => self.handle_command(command),
                Step::Link(event) => self.on_link_event(event),
                Step::Heartbeat => self.on_heartbeat(),
                Step::Sample => self.on_sample(),
            }
        }

        self.teardown_link();
        info!(frames = self.log.len(), "Session actor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { config, reply } => {
                let result = match config {
                    Some(config) => self.configure(config),
                    None => Ok(()),
                };
                if result.is_ok() {
                    self.connect();
                }
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.disconnect();
                let _ = reply.send(());
            }
            Command::Send { kind, payload, reply } => {
                let _ = reply.send(self.send(kind, payload));
            }
            Command::Configure { config, reply } => {
                let _ = reply.send(self.configure(config));
            }
            Command::Config { reply } => {
                let _ = reply.send(self.config.clone());
            }
            Command::Frames { reply } => {
                let _ = reply.send(self.log.frames().to_vec());
            }
            Command::Search { query, reply } => {
                let _ = reply.send(self.log.search(&query));
            }
            Command::ClearLog { reply } => {
                let _ = reply.send(self.clear_log());
            }
            Command::Metrics { reply } => {
                let _ = reply.send(self.sampler.window().samples());
            }
        }
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.outputs.events.send(event);
        self.outputs.revision.send_modify(|revision| *revision += 1);
    }

    fn append(&mut self, draft: FrameDraft) -> Arc<Frame> {
        let frame = self.log.append(draft, self.deps.clock.now_millis());
        self.sampler.record(frame.direction);
        self.notify(SessionEvent::FrameAppended(Arc::clone(&frame)));
        frame
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        self.outputs.state.send_replace(to);
        info!(%from, %to, epoch = self.epoch, "Session state changed");
        self.notify(SessionEvent::StateChanged { from, to });
        self.reschedule_heartbeat();
    }

    /// Replace the heartbeat timer to match the current state and settings
    fn reschedule_heartbeat(&mut self) {
        let heartbeat = &self.config.heartbeat;
        self.heartbeat = (self.state == SessionState::Connected && heartbeat.enabled)
            .then(|| delayed_interval(heartbeat.interval()));
        debug!(active = self.heartbeat.is_some(), interval_ms = heartbeat.interval_ms, "Heartbeat scheduled");
    }

    fn next_epoch(&mut self) -> Epoch {
        self.epoch += 1;
        self.epoch
    }

    fn teardown_link(&mut self) {
        if let Some(link) = self.link.take() {
            debug!(epoch = link.epoch, origin = ?link.origin, "Tearing down link");
            link.shutdown();
        }
        self.next_epoch();
    }

    fn connect(&mut self) {
        self.teardown_link();

        let url = self.config.url.clone();
        self.append(FrameDraft::outbound(FrameKind::System, format!("Attempting connection to {url}...")));
        self.transition(SessionState::Connecting);

        if self.config.prefers_simulation() {
            debug!(%url, "Address selects the simulated peer");
            self.activate_simulated();
            return;
        }

        let epoch = self.next_epoch();
        info!(epoch, %url, "Opening live link");
        self.link = Some(Driver::spawn_network(
            epoch,
            Arc::clone(&self.deps.connector),
            url,
            self.settings.connect_timeout(),
            self.link_tx.clone(),
        ));
    }

    fn activate_simulated(&mut self) {
        let peer = match SimulatedPeer::attach(self.settings.peer.clone(), StdRng::from_rng(&mut self.rng)) {
            Ok(peer) => peer,
            Err(e) => {
                warn!(error = %e, "Simulated peer rejected its settings");
                self.transition(SessionState::Error);
                self.append(FrameDraft::inbound(FrameKind::Error, format!("Simulated peer unavailable: {e}")));
                return;
            }
        };
        let epoch = self.next_epoch();
        info!(epoch, "Simulated peer active");
        self.link = Some(Driver::spawn_attached(
            epoch,
            TransportOrigin::Simulated,
            Box::new(peer),
            self.link_tx.clone(),
        ));
        self.transition(SessionState::Connected);
        self.authenticate();
    }

    /// Send the AUTH envelope when a credential is configured
    fn authenticate(&mut self) {
        if !self.config.has_credential() {
            return;
        }
        let Some(link) = self.link.as_ref().filter(|link| link.is_ready()) else {
            return;
        };
        if link.transmit(envelope::auth(&self.config.token)) {
            let masked = format!("Bearer {}...", credential_prefix(&self.config.token));
            self.append(FrameDraft::outbound(FrameKind::Auth, masked));
        }
    }

    fn disconnect(&mut self) {
        self.teardown_link();
        self.transition(SessionState::Disconnected);
    }

    pub(super) fn send(&mut self, kind: FrameKind, payload: String) -> SendOutcome {
        if let Some(link) = self.link.as_ref().filter(|link| link.is_ready()) {
            if link.transmit(payload.clone()) {
                let frame = self.append(FrameDraft::outbound(kind, payload));
                return SendOutcome::Sent(frame.id);
            }
            link.mark_unready();
        }

        if self.state == SessionState::Connected {
            self.append(FrameDraft::inbound(FrameKind::Error, SEND_FAILED));
            SendOutcome::Failed
        } else {
            trace!(%kind, state = %self.state, "Send ignored");
            SendOutcome::Ignored
        }
    }

    fn configure(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;

        let reschedule = self.config.heartbeat.schedule_differs(&config.heartbeat);
        self.config = config;
        persistence::save_json(self.deps.store.as_ref(), keys::CONFIG, &self.config);
        self.notify(SessionEvent::ConfigChanged(self.config.clone()));

        if reschedule {
            self.reschedule_heartbeat();
        }
        Ok(())
    }

    fn clear_log(&mut self) -> usize {
        let removed = self.log.clear();
        if removed > 0 {
            debug!(removed, "Log cleared");
            self.notify(SessionEvent::LogCleared { removed });
        }
        removed
    }

    fn on_heartbeat(&mut self) {
        if self.state != SessionState::Connected {
            self.heartbeat = None;
            return;
        }
        let payload = self.config.heartbeat.payload.clone();
        let outcome = self.send(FrameKind::HeartbeatPing, payload);
        trace!(?outcome, "Heartbeat");
    }

    fn on_sample(&mut self) {
        let latency = self.rng.random_range(LATENCY_MS);
        let sample = self.sampler.sample(self.deps.clock.now_millis(), latency);
        self.notify(SessionEvent::Sample(sample));
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        let Some(link) = self.link.as_ref().filter(|link| link.epoch == event.epoch) else {
            trace!(epoch = event.epoch, current = self.epoch, "Dropping stale link event");
            return;
        };
        let origin = link.origin;

        match event.kind {
            LinkEventKind::Opened => {
                self.transition(SessionState::Connected);
                self.append(FrameDraft::inbound(FrameKind::System, "Connection established"));
                self.authenticate();
            }
            LinkEventKind::OpenFailed(reason) => {
                self.link = None;
                self.append(FrameDraft::inbound(
                    FrameKind::System,
                    format!("Live endpoint unavailable ({reason}); using simulated peer"),
                ));
                self.activate_simulated();
            }
            LinkEventKind::Inbound(TransportEvent::Message(text)) => {
                let (kind, payload) = match origin {
                    TransportOrigin::Network => (classifier::classify(&text), text),
                    TransportOrigin::Simulated => classifier::translate_envelope(&text),
                };
                self.append(FrameDraft::inbound(kind, payload));
            }
            LinkEventKind::Inbound(TransportEvent::Closed) => {
                self.link = None;
                self.transition(SessionState::Disconnected);
                self.append(FrameDraft::inbound(FrameKind::System, "Connection closed"));
            }
            LinkEventKind::Inbound(TransportEvent::Error(reason)) => {
                link.mark_unready();
                self.transition(SessionState::Error);
                self.append(FrameDraft::inbound(FrameKind::Error, format!("Network error: {reason}")));
            }
        }
    }
}
