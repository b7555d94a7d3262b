//! Poll loop — periodic inventory, classification and heartbeat delivery.
//!
//! The loop owns the failure streak and threads it through
//! [`Reporter::evaluate`] once per cycle. Between cycles it waits on the
//! interval timer raced against the shutdown channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use stackbeat_core::{IgnoreSet, InventoryProvider, NotificationSink, PingTargets, Settings};

use crate::classifier::classify;
use crate::reporter::{Action, CycleOutcome, ErrorStreak, Reporter};

/// Lifecycle of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What a finished loop leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Completed cycles.
    pub cycles: u64,
    /// Failure streak after the last cycle.
    pub streak: ErrorStreak,
}

/// Drives poll cycles for one compose project.
pub struct Poller {
    project: String,
    ignore: IgnoreSet,
    targets: PingTargets,
    interval: Duration,
    reporter: Reporter,
    inventory: Arc<dyn InventoryProvider>,
    sink: Arc<dyn NotificationSink>,
}

impl Poller {
    /// Create a poller from resolved settings.
    pub fn new(
        settings: &Settings,
        inventory: Arc<dyn InventoryProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            project: settings.project.clone(),
            ignore: settings.ignore.clone(),
            targets: settings.targets.clone(),
            interval: settings.interval,
            reporter: Reporter::new(settings.error_threshold),
            inventory,
            sink,
        }
    }

    /// List and classify the project's containers.
    ///
    /// A failed listing still yields an outcome: an empty classification
    /// carrying the error message.
    pub async fn observe(&self) -> CycleOutcome {
        match self.inventory.list(&self.project).await {
            Ok(observations) => {
                let classification = classify(&observations, &self.ignore);
                debug!(
                    project = %self.project,
                    containers = observations.len(),
                    running = ?classification.running,
                    exited = ?classification.exited,
                    unhealthy = ?classification.unhealthy,
                    "inventory classified"
                );
                CycleOutcome::fetched(classification)
            }
            Err(e) => {
                warn!(project = %self.project, error = %e, "inventory listing failed");
                CycleOutcome::fetch_failed(classify(&[], &self.ignore), e.to_string())
            }
        }
    }

    /// Run one full cycle: observe, decide, deliver.
    ///
    /// Returns the streak to feed into the next cycle. Delivery failures
    /// are logged and never change the streak.
    pub async fn run_cycle(&self, previous: ErrorStreak) -> (ErrorStreak, Action) {
        let outcome = self.observe().await;
        let (streak, action) = self.reporter.evaluate(&outcome, previous);

        match &action {
            Action::ReportSuccess(body) => {
                self.deliver(&self.targets.success, body, "success").await;
            }
            Action::ReportFailure(body) => {
                warn!(
                    project = %self.project,
                    %streak,
                    diagnostic = %body,
                    "project failing, reporting"
                );
                self.deliver(&self.targets.failure, body, "failure").await;
            }
            Action::Suppress => {
                info!(
                    project = %self.project,
                    %streak,
                    threshold = self.reporter.error_threshold(),
                    "project failing, below error threshold"
                );
            }
        }

        (streak, action)
    }

    async fn deliver(&self, url: &str, body: &str, kind: &'static str) {
        match self.sink.post(url, body.to_string()).await {
            Ok(()) => debug!(%url, kind, "heartbeat delivered"),
            Err(e) => error!(%url, kind, error = %e, "heartbeat delivery failed"),
        }
    }

    /// Run cycles until `shutdown` fires.
    ///
    /// The first cycle starts immediately. Shutdown is only observed between
    /// cycles, so a cycle in progress always completes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> PollSummary {
        info!(
            project = %self.project,
            interval_secs = self.interval.as_secs(),
            threshold = self.reporter.error_threshold(),
            "poll loop started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        let mut summary = PollSummary {
            cycles: 0,
            streak: ErrorStreak::ZERO,
        };
        let mut state = LoopState::Running;

        while state == LoopState::Running {
            let (streak, _) = self.run_cycle(summary.streak).await;
            summary.streak = streak;
            summary.cycles += 1;

            state = checkpoint(&mut ticker, &mut shutdown).await;
        }

        info!(
            project = %self.project,
            cycles = summary.cycles,
            "poll loop stopped"
        );
        summary
    }
}

/// Wait for the next tick unless shutdown was requested first.
async fn checkpoint(ticker: &mut Interval, shutdown: &mut watch::Receiver<bool>) -> LoopState {
    if *shutdown.borrow_and_update() {
        return LoopState::Stopped;
    }

    tokio::select! {
        biased;
        _ = shutdown.changed() => {
            debug!("poll loop shutting down");
            LoopState::Stopped
        }
        _ = ticker.tick() => LoopState::Running,
    }
}
