//! In-process simulated peer
//!
//! Stands in for a remote endpoint when no live one is reachable. It speaks
//! the envelope protocol: welcomes on attach, answers PING with PONG, confirms
//! AUTH, echoes MESSAGE/BROADCAST and now and then broadcasts a load alert.
//!
//! Replies are scheduled on a [`DelayQueue`] owned by the peer, so detaching
//! drops every pending reply in one step and nothing can arrive afterwards.

use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::time::DelayQueue;
use tracing::debug;

use super::{Transport, TransportEvent};
use crate::Result;
use crate::classifier::{self, Structure};
use crate::envelope::{self, EnvelopeType};
use crate::settings::PeerSettings;
use crate::types::credential_prefix;

/// Welcome text sent after attach
pub(crate) const WELCOME: &str = "Connected to NetPulse simulated peer v1.0";

const ECHO_SENDER: &str = "ECHO_SERVICE";
const BROADCAST_SENDER: &str = "SERVER";
const WORKER_NODES: u32 = 10;

/// Simulated remote endpoint
pub struct SimulatedPeer<R = StdRng> {
    settings: PeerSettings,
    rng: R,
    pending: DelayQueue<String>,
    broadcast: Option<Interval>,
    attached: bool,
}

enum Step {
    Due(String),
    Roll,
}

impl<R: RngCore + Send + 'static> SimulatedPeer<R> {
    /// Attach a fresh peer; the welcome is scheduled immediately
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidConfig`](crate::ConsoleError::InvalidConfig)
    /// if the broadcast chance is outside `0..=1` or broadcasts are enabled
    /// with a zero period.
    pub fn attach(settings: PeerSettings, rng: R) -> Result<Self> {
        settings.validate()?;

        let mut pending = DelayQueue::new();
        pending.insert(envelope::encode(EnvelopeType::System, WELCOME), settings.welcome_delay());

        let broadcast = (settings.broadcast_chance > 0.0).then(|| {
            let period = settings.broadcast_period();
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        debug!(broadcasts = broadcast.is_some(), "Simulated peer attached");
        Ok(Self { settings, rng, pending, broadcast, attached: true })
    }

    /// Drop every pending reply and stop broadcasting
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.pending.clear();
        self.broadcast = None;
        debug!("Simulated peer detached");
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of replies still scheduled
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn schedule(&mut self, text: String, delay: Duration) {
        self.pending.insert(text, delay);
    }

    fn respond(&mut self, text: &str) {
        let Structure::Parsed(mut value) = classifier::inspect(text) else {
            debug!(len = text.len(), "Simulated peer ignored non-envelope frame");
            return;
        };
        match envelope::discriminator(&value) {
            Some(EnvelopeType::Ping) => {
                let reply = envelope::encode(EnvelopeType::Pong, "ack");
                self.schedule(reply, self.settings.pong_delay());
            }
            Some(EnvelopeType::Auth) => {
                let credential = ["token", "content"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str))
                    .unwrap_or_default();
                let greeting = format!("Authenticated as User-{}...", credential_prefix(credential));
                let reply = envelope::encode(EnvelopeType::System, &greeting);
                self.schedule(reply, self.settings.auth_delay());
            }
            Some(EnvelopeType::Message | EnvelopeType::Broadcast) => {
                if let Some(fields) = value.as_object_mut() {
                    fields.insert("sender".to_string(), Value::from(ECHO_SENDER));
                }
                self.schedule(value.to_string(), self.settings.echo_delay());
            }
            other => {
                debug!(discriminator = ?other, "Simulated peer ignored envelope");
            }
        }
    }

    fn roll_broadcast(&mut self) -> Option<String> {
        if !self.rng.random_bool(self.settings.broadcast_chance) {
            return None;
        }
        let node = self.rng.random_range(0..WORKER_NODES);
        let alert = json!({
            "type": EnvelopeType::Broadcast.as_str(),
            "content": format!("System Alert: High load on worker node #{node}"),
            "sender": BROADCAST_SENDER,
        });
        Some(alert.to_string())
    }
}

async fn tick(broadcast: &mut Option<Interval>) {
    match broadcast {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[async_trait::async_trait]
impl<R: RngCore + Send + 'static> Transport for SimulatedPeer<R> {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.attached {
            self.respond(&text);
        }
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            if !self.attached {
                return TransportEvent::Closed;
            }

            let step = tokio::select! {
                Some(expired) = self.pending.next(), if !self.pending.is_empty() => {
                    Step::Due(expired.into_inner())
                }
                _ = tick(&mut self.broadcast) => Step::Roll,
            };

            match step {
                Step::Due(text) => return TransportEvent::Message(text),
                Step::Roll => {
                    if let Some(alert) = self.roll_broadcast() {
                        return TransportEvent::Message(alert);
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        self.detach();
    }
}
