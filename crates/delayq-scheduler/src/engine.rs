use std::{convert::Infallible, time::Duration};

use chrono::{DateTime, Utc};
use delayq_core::{Context, Job, JobId, SchedulerConfig};
use delayq_storage::Storage;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SchedulerError};

/// Owns a storage backend and drives execution of due jobs.
///
/// Delivery is at-least-once: if deleting an executed job fails, the entry
/// stays in storage and runs again on the next poll. Duplicates are not
/// filtered out. Two schedulers polling the same store can also both run an
/// entry; nothing here coordinates them.
///
/// Share it behind an `Arc` to schedule jobs while the loop runs.
pub struct Scheduler<C> {
    storage: Box<dyn Storage<C>>,
    config: SchedulerConfig,
}

impl<C: Context> Scheduler<C> {
    pub fn new(storage: impl Storage<C> + 'static) -> Self {
        Self::with_config(storage, SchedulerConfig::default())
    }

    pub fn with_config(storage: impl Storage<C> + 'static, config: SchedulerConfig) -> Self {
        Self {
            storage: Box::new(storage),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn Storage<C> {
        self.storage.as_ref()
    }

    /// Persist `job` to run `delay` from now. Returns the assigned id.
    pub fn schedule_in(&self, job: &mut dyn Job<C>, delay: Duration) -> Result<JobId> {
        let due_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or(SchedulerError::InvalidDelay(delay))?;
        self.schedule_at(job, due_at)
    }

    /// Persist `job` to run at `due_at`.
    pub fn schedule_at(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId> {
        Ok(self.storage.push(job, due_at)?)
    }

    /// One poll cycle at the current time. See [`tick_at`](Self::tick_at).
    pub async fn tick(&self, ctx: &C) -> Result<usize> {
        self.tick_at(ctx, Utc::now()).await
    }

    /// Run every job due at `now`, one after another, deleting each after it
    /// ran. Returns how many jobs were executed.
    ///
    /// A failed delete is logged and skipped. A failed poll is returned
    /// before anything runs.
    pub async fn tick_at(&self, ctx: &C, now: DateTime<Utc>) -> Result<usize> {
        let due = self.storage.get_due(now).map_err(|e| {
            if e.is_fatal() {
                SchedulerError::Reconstruction(e)
            } else {
                SchedulerError::Storage(e)
            }
        })?;

        if !due.is_empty() {
            debug!(count = due.len(), "due jobs fetched");
        }

        for job in &due {
            info!(job_id = %job.id(), kind = %job.kind(), "executing job");
            job.execute(ctx.clone()).await;

            if let Err(e) = self.storage.delete(job.id()) {
                warn!(job_id = %job.id(), error = %e, "failed to delete executed job; it will run again");
            }
        }
        Ok(due.len())
    }

    /// Main dispatch loop. Polls every `sleep_duration` and never returns,
    /// except when a due record cannot be rebuilt.
    pub async fn listen(&self, ctx: C) -> Result<Infallible> {
        info!(sleep_ms = self.config.sleep_duration_ms, "scheduler listening");
        loop {
            self.cycle(&ctx).await?;
            tokio::time::sleep(self.config.sleep_duration()).await;
        }
    }

    /// Like [`listen`](Self::listen), but returns `Ok(())` once `shutdown`
    /// broadcasts `true` or its sender is dropped.
    pub async fn run(&self, ctx: C, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(sleep_ms = self.config.sleep_duration_ms, "scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.cycle(&ctx).await?;

            tokio::select! {
                _ = tokio::time::sleep(self.config.sleep_duration()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("scheduler shutting down");
        Ok(())
    }

    /// A poll cycle as the loops see it: only reconstruction failures escape.
    async fn cycle(&self, ctx: &C) -> Result<()> {
        match self.tick(ctx).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "due job cannot be rebuilt; stopping scheduler");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "poll failed; retrying next cycle");
                Ok(())
            }
        }
    }
}
