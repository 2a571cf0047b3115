//! Periodic driver of the ranking job.
//!
//! [`RankingScheduler::start`] spawns a loop that ticks on a
//! `tokio::time::interval` and awaits one pass per tick. Missed ticks are
//! skipped rather than bursted, and because each tick awaits its pass the
//! scheduler never overlaps itself. On-demand passes that race a tick are
//! turned away by the job's single-flight guard.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::service::{PassOutcome, RankingJob};

/// Shortest accepted period between passes.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the running ranking loop.
///
/// Dropping the handle also ends the loop, after any in-flight pass.
#[derive(Debug)]
pub struct RankingScheduler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RankingScheduler {
    /// Spawns the ranking loop. With `run_on_start` the first pass runs
    /// immediately, otherwise after one full `interval`. Intervals shorter
    /// than [`MIN_INTERVAL`] are raised to it.
    #[must_use]
    pub fn start(job: Arc<RankingJob>, interval: Duration, run_on_start: bool) -> Self {
        let period = interval.max(MIN_INTERVAL);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(job, period, run_on_start, shutdown_rx));
        tracing::info!(interval_secs = period.as_secs(), run_on_start, "ranking scheduler started");
        Self {
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Returns `true` while the loop task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals the loop to stop and waits for it to exit. A pass in flight
    /// is allowed to finish first.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            tracing::error!(error = %err, "ranking scheduler task failed");
        }
        tracing::info!("ranking scheduler stopped");
    }
}

async fn run_loop(
    job: Arc<RankingJob>,
    period: Duration,
    run_on_start: bool,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let first_tick = if run_on_start {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_pass(&job).await,
            _ = &mut shutdown_rx => break,
        }
    }
}

async fn run_pass(job: &RankingJob) {
    match job.recalculate_rankings().await {
        Ok(PassOutcome::Completed(report)) => {
            tracing::debug!(pass_id = %report.pass_id, ranked = report.ranked, "scheduled pass done");
        }
        Ok(PassOutcome::Skipped) => {
            tracing::debug!("scheduled pass skipped; another pass is running");
        }
        Err(err) => {
            tracing::error!(error = %err, "scheduled ranking pass failed");
        }
    }
}
