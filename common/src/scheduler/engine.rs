// Scheduler engine: minute ticks driving due evaluation and backup cycles

use crate::backup::BackupRunner;
use crate::cadence::Cadence;
use crate::scheduler::due::DueTracker;
use crate::storage::BackupStore;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Tick period of the scheduler loop
const TICK_PERIOD: StdDuration = StdDuration::from_secs(60);

/// Counts from one evaluation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Cadences that were due and triggered
    pub triggered: usize,
    /// Triggered cadences whose cycle failed
    pub failed: usize,
}

/// Evaluates cadences once a minute and runs due backup cycles sequentially
pub struct BackupScheduler {
    store: Arc<dyn BackupStore>,
    runner: BackupRunner,
    tracker: DueTracker,
    subfolder: String,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl BackupScheduler {
    /// Create a new scheduler around a runner and its store
    pub fn new(
        store: Arc<dyn BackupStore>,
        runner: BackupRunner,
        subfolder: impl Into<String>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            store,
            runner,
            tracker: DueTracker::new(),
            subfolder: subfolder.into(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle for requesting a graceful stop of [`run`](Self::run)
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Read access to the due-state
    pub fn tracker(&self) -> &DueTracker {
        &self.tracker
    }

    /// Seed due-state from archives already in the store
    pub async fn seed(&mut self) {
        self.tracker
            .seed(self.store.as_ref(), &self.subfolder)
            .await;
    }

    /// One evaluation pass at the current wall-clock time
    pub async fn run_once(&mut self) -> TickOutcome {
        self.run_once_at(Utc::now()).await
    }

    /// One evaluation pass: check every cadence coarsest first and run a
    /// full cycle for each that is due. A failed cycle leaves its cadence
    /// due and does not stop the remaining cadences.
    #[instrument(skip(self), fields(now = %now))]
    pub async fn run_once_at(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for cadence in Cadence::ALL {
            if !self.tracker.is_due(cadence, now) {
                continue;
            }
            outcome.triggered += 1;

            match self.runner.run(cadence).await {
                Ok(_) => {
                    self.tracker.mark_succeeded(cadence, Utc::now());
                }
                Err(e) => {
                    error!(
                        cadence = %cadence,
                        error = %e,
                        "Backup cycle failed, cadence stays due"
                    );
                    // Continue with the remaining cadences
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Run the scheduler loop until a shutdown signal arrives.
    ///
    /// The first tick lands on the next whole minute and later ticks follow
    /// every minute. Ticks that pass while cycles are still running are
    /// skipped rather than replayed in a burst.
    pub async fn run(&mut self) {
        // The receiver held since construction buffers a shutdown sent
        // before the loop starts
        let mut shutdown_rx =
            std::mem::replace(&mut self.shutdown_rx, self.shutdown_tx.subscribe());

        let first_tick = Instant::now() + until_next_minute(Utc::now());
        let mut ticks = interval_at(first_tick, TICK_PERIOD);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_seconds = TICK_PERIOD.as_secs(),
            "Backup scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    let outcome = self.run_once().await;
                    if outcome.triggered > 0 {
                        info!(
                            triggered = outcome.triggered,
                            failed = outcome.failed,
                            "Scheduler tick finished"
                        );
                    } else {
                        debug!("Scheduler tick finished, no cadences due");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Backup scheduler stopped");
    }
}

/// Time remaining until the next whole minute
fn until_next_minute(now: DateTime<Utc>) -> StdDuration {
    let next = (now + Duration::minutes(1))
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or_else(|| now + Duration::minutes(1));
    (next - now)
        .to_std()
        .unwrap_or_else(|_| TICK_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_minute_mid_minute() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 30).unwrap();
        assert_eq!(until_next_minute(now), StdDuration::from_secs(30));
    }

    #[test]
    fn test_until_next_minute_on_boundary_waits_full_minute() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
        assert_eq!(until_next_minute(now), StdDuration::from_secs(60));
    }

    #[test]
    fn test_until_next_minute_strips_nanoseconds() {
        let now = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 5, 59)
            .unwrap()
            .with_nanosecond(400_000_000)
            .unwrap();
        assert_eq!(until_next_minute(now), StdDuration::from_millis(600));
    }
}
