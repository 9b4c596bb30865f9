//! Repeated-send load generator
//!
//! A stress run sends one draft a fixed number of times at a fixed interval
//! through a session, reporting progress as it goes. It talks to the session
//! actor through the same command channel as a [`SessionHandle`], but does
//! not keep the session alive.
//!
//! [`SessionHandle`]: crate::SessionHandle

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::{Command, SendOutcome};
use crate::types::Draft;
use crate::{ConsoleError, Result};

/// What to send, how often and how many times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressPlan {
    pub draft: Draft,
    pub count: u32,
    pub interval: Duration,
}

impl StressPlan {
    pub fn new(draft: Draft, count: u32, interval: Duration) -> Self {
        Self { draft, count, interval }
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(ConsoleError::invalid_config("stress count must be greater than zero"));
        }
        if self.interval.is_zero() {
            return Err(ConsoleError::invalid_config("stress interval must be greater than zero"));
        }
        if self.draft.is_blank() {
            return Err(ConsoleError::invalid_config("stress payload must not be blank"));
        }
        Ok(())
    }
}

/// Progress of a stress run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StressProgress {
    /// Sends issued so far
    pub attempted: u32,

    /// Sends that produced an outbound frame
    pub delivered: u32,

    pub total: u32,
}

impl StressProgress {
    /// Rounded share of attempted sends, 0..=100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((u64::from(self.attempted) * 100 + u64::from(self.total) / 2) / u64::from(self.total)) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.attempted >= self.total
    }
}

/// A running stress test
pub struct StressRun {
    progress: watch::Receiver<StressProgress>,
    cancel: CancellationToken,
    task: JoinHandle<StressProgress>,
}

impl StressRun {
    pub(crate) fn spawn(commands: mpsc::Sender<Command>, plan: StressPlan) -> Result<Self> {
        plan.validate()?;

        let initial = StressProgress { total: plan.count, ..StressProgress::default() };
        let (progress_tx, progress_rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::drive(commands, plan, progress_tx, cancel.clone()));
        Ok(Self { progress: progress_rx, cancel, task })
    }

    async fn drive(
        commands: mpsc::Sender<Command>,
        plan: StressPlan,
        progress: watch::Sender<StressProgress>,
        cancel: CancellationToken,
    ) -> StressProgress {
        info!(count = plan.count, interval = ?plan.interval, kind = %plan.draft.kind, "Stress run started");
        let mut ticker = interval_at(Instant::now() + plan.interval, plan.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut current = *progress.borrow();

        while !current.is_complete() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(attempted = current.attempted, "Stress run stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let (reply, outcome) = oneshot::channel();
            let command = Command::Send {
                kind: plan.draft.kind,
                payload: plan.draft.payload.clone(),
                reply,
            };
            if commands.send(command).await.is_err() {
                debug!("Session gone, stress run ends");
                break;
            }
            let Ok(outcome) = outcome.await else {
                debug!("Session gone, stress run ends");
                break;
            };

            current.attempted += 1;
            if let SendOutcome::Sent(_) = outcome {
                current.delivered += 1;
            }
            progress.send_replace(current);
        }

        info!(attempted = current.attempted, delivered = current.delivered, "Stress run finished");
        current
    }

    pub fn progress(&self) -> StressProgress {
        *self.progress.borrow()
    }

    /// Stop before the next send
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end and return the final progress
    pub async fn finished(self) -> StressProgress {
        let last = *self.progress.borrow();
        self.task.await.unwrap_or(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_validated() {
        let ok = StressPlan::new(Draft::text("x"), 3, Duration::from_millis(50));
        assert!(ok.validate().is_ok());
        assert!(StressPlan { count: 0, ..ok.clone() }.validate().is_err());
        assert!(StressPlan { interval: Duration::ZERO, ..ok.clone() }.validate().is_err());
        assert!(StressPlan { draft: Draft::text(" "), ..ok }.validate().is_err());
    }

    #[test]
    fn percent_rounds_attempted_share() {
        let progress = StressProgress { attempted: 1, delivered: 1, total: 3 };
        assert_eq!(progress.percent(), 33);
        let progress = StressProgress { attempted: 2, delivered: 0, total: 3 };
        assert_eq!(progress.percent(), 67);
        assert_eq!(StressProgress { attempted: 3, delivered: 3, total: 3 }.percent(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_session_is_gone() {
        let (commands, receiver) = mpsc::channel(4);
        drop(receiver);
        let run = StressRun::spawn(commands, StressPlan::new(Draft::text("x"), 5, Duration::from_millis(10)))
            .unwrap();
        let last = run.finished().await;
        assert_eq!(last.attempted, 0);
        assert_eq!(last.total, 5);
    }
}
