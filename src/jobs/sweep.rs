//! Background job: purge expired token rows.
//!
//! Every `period` (first tick one full period after start):
//! 1. Count rows with `expired_at <= now`.
//! 2. If counting fails, report it and stop for good. A broken read path
//!    means the table or connection is gone.
//! 3. If anything expired, delete it. A failed delete is reported and
//!    retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::clock::Clock;
use crate::errors::StoreResult;
use crate::sink::SharedSink;

/// What the sweep needs from storage.
#[async_trait]
pub trait ExpiredTokens: Send + Sync {
    async fn count_expired(&self, now: i64) -> StoreResult<i64>;

    async fn delete_expired(&self, now: i64) -> StoreResult<u64>;
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Nothing had expired.
    Clean,
    Purged(u64),
    /// Delete failed; the same rows are picked up next tick.
    Retry,
    /// Count failed; the loop must stop.
    Halt,
}

/// Why a sweep task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepExit {
    Stopped,
    Halted,
    Panicked,
}

pub async fn sweep_once(target: &dyn ExpiredTokens, now: i64, sink: &SharedSink) -> SweepOutcome {
    let expired = match target.count_expired(now).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "sweep: counting expired tokens failed, stopping");
            sink.report(&e);
            return SweepOutcome::Halt;
        }
    };

    if expired <= 0 {
        tracing::debug!(now, "sweep: nothing expired");
        return SweepOutcome::Clean;
    }

    match target.delete_expired(now).await {
        Ok(rows) => {
            tracing::info!(rows, now, "sweep: purged expired tokens");
            SweepOutcome::Purged(rows)
        }
        Err(e) => {
            tracing::warn!(error = %e, expired, "sweep: delete failed, will retry");
            sink.report(&e);
            SweepOutcome::Retry
        }
    }
}

/// Owns a running sweep task. Dropping the handle stops the task.
pub struct SweepHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<SweepExit>,
}

impl SweepHandle {
    /// Signal the task and wait for it to finish.
    pub async fn stop(self) -> SweepExit {
        let _ = self.shutdown.send(());
        exit_of(self.task.await)
    }

    /// Wait for the task to end on its own (i.e. after a halt).
    pub async fn join(self) -> SweepExit {
        let SweepHandle { shutdown, task } = self;
        let exit = exit_of(task.await);
        drop(shutdown);
        exit
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn exit_of(res: Result<SweepExit, tokio::task::JoinError>) -> SweepExit {
    res.unwrap_or_else(|e| {
        tracing::error!(error = %e, "sweep task panicked");
        SweepExit::Panicked
    })
}

/// Spawn the background sweep. Call this once per store.
pub fn spawn(
    target: Arc<dyn ExpiredTokens>,
    clock: Arc<dyn Clock>,
    sink: SharedSink,
    period: Duration,
) -> SweepHandle {
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
    let first_tick = Instant::now() + period;

    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("sweep: shutdown requested");
                    return SweepExit::Stopped;
                }
                _ = interval.tick() => {
                    let now = clock.unix_now();
                    if sweep_once(target.as_ref(), now, &sink).await == SweepOutcome::Halt {
                        return SweepExit::Halted;
                    }
                }
            }
        }
    });

    SweepHandle { shutdown, task }
}
