//! Periodic retention sweeps.
//!
//! Runs independently of statement capture: one sweep on start, then one
//! per interval until the shutdown future resolves.

use std::future::Future;
use std::time::Duration;

use tokio::time::interval;

use lineage_graph::{EdgeReaper, RetentionSweeper};

/// What a scheduler run accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepTotals {
    pub runs: u64,
    pub deleted: u64,
}

/// Shortest accepted sweep interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Drives a [`RetentionSweeper`] on a fixed interval.
pub struct SweepScheduler<R> {
    sweeper: RetentionSweeper<R>,
    retention_days: i64,
    every: Duration,
}

impl<R: EdgeReaper> SweepScheduler<R> {
    /// Intervals below one second are raised to one second.
    pub fn new(sweeper: RetentionSweeper<R>, retention_days: i64, every: Duration) -> Self {
        if every < MIN_INTERVAL {
            tracing::warn!(
                every_ms = every.as_millis() as u64,
                min_secs = MIN_INTERVAL.as_secs(),
                "Retention interval too short, clamping"
            );
        }
        Self {
            sweeper,
            retention_days,
            every: every.max(MIN_INTERVAL),
        }
    }

    /// Sweep on every tick until `shutdown` completes.
    pub async fn run_until<F: Future>(&self, shutdown: F) -> SweepTotals {
        let mut totals = SweepTotals::default();

        if self.retention_days <= 0 {
            tracing::info!(
                retention_days = self.retention_days,
                "Retention disabled, scheduler idle"
            );
            shutdown.await;
            return totals;
        }

        let mut ticker = interval(self.every);
        tokio::pin!(shutdown);

        tracing::info!(
            retention_days = self.retention_days,
            every_secs = self.every.as_secs(),
            "Retention scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    totals.runs += 1;
                    totals.deleted += self.sweeper.sweep(self.retention_days).await;
                }
            }
        }

        tracing::info!(
            runs = totals.runs,
            deleted = totals.deleted,
            "Retention scheduler stopped"
        );
        totals
    }
}
