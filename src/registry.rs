//! Lifecycle management for recurring crawl jobs.
//!
//! [`JobRegistry`] owns the map from source url to a live, cancellable cron
//! job on a shared `tokio-cron-scheduler` instance. It is mutated from two
//! directions at once, lifecycle callers reacting to source create/update/
//! delete on one side and the scheduler's own callback tasks on the other,
//! so the map is a [`DashMap`] and replacing one source's job never touches
//! another's handle. Register and unregister additionally serialize on a
//! lifecycle lock, so two concurrent registrations of the same url cannot
//! each add a cron job and then race on the single map slot.
//!
//! # Error boundary
//!
//! Every scheduled tick runs behind a catch-log-continue boundary: a failing
//! source is logged and waits for its next tick, it never disables the shared
//! scheduler or any other source's job.
//!
//! # Overlap policy
//!
//! A tick that fires while the previous run for the same source is still
//! executing is skipped (try-lock on a per-source gate) rather than run
//! concurrently. Schedules denser than a source's page latency therefore
//! degrade to back-to-back runs, not to a pile-up.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::CrawlError;
use crate::job::SourceJob;
use crate::models::Source;

/// A live recurring schedule for one source. Exclusively owned by the
/// registry; dropping it without `scheduler.remove` would leak the cron job,
/// which is why cancellation always goes through [`JobRegistry::unregister`].
struct ScheduledJobHandle {
    job_id: Uuid,
}

/// Concurrent registry of per-source recurring jobs.
pub struct JobRegistry {
    scheduler: JobScheduler,
    runner: Arc<SourceJob>,
    jobs: DashMap<String, ScheduledJobHandle>,
    // Serializes register/unregister so a cancel-then-add pair is atomic.
    lifecycle: Mutex<()>,
}

impl JobRegistry {
    /// Create the registry on a freshly started scheduler.
    pub async fn new(runner: Arc<SourceJob>) -> Result<Self, CrawlError> {
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;
        Ok(Self {
            scheduler,
            runner,
            jobs: DashMap::new(),
            lifecycle: Mutex::new(()),
        })
    }

    /// Schedule (or reschedule) recurring crawls for a source.
    ///
    /// Any existing job for `source.url` is cancelled first, so calling this
    /// twice replaces rather than duplicates. An inactive source only gets
    /// the cancellation. A malformed schedule fails with
    /// [`CrawlError::InvalidSchedule`] and leaves the source unscheduled.
    #[instrument(level = "info", skip_all, fields(url = %source.url))]
    pub async fn register(&self, source: &Source) -> Result<(), CrawlError> {
        let _guard = self.lifecycle.lock().await;
        self.cancel(&source.url).await;

        if !source.is_active {
            info!("Source is inactive; leaving it unscheduled");
            return Ok(());
        }

        validate_schedule(source)?;

        let runner = Arc::clone(&self.runner);
        let job_source = Arc::new(source.clone());
        // Per-source gate implementing the skip-on-overlap policy.
        let gate = Arc::new(Mutex::new(()));

        let job = Job::new_async(source.schedule.as_str(), move |_job_id, _scheduler| {
            let runner = Arc::clone(&runner);
            let source = Arc::clone(&job_source);
            let gate = Arc::clone(&gate);
            Box::pin(async move {
                let Ok(_running) = gate.try_lock() else {
                    warn!(url = %source.url, "Previous run still executing; skipping this tick");
                    return;
                };
                match runner.run(&source).await {
                    Ok(new_articles) => {
                        debug!(url = %source.url, new_articles, "Scheduled run finished")
                    }
                    Err(e) => {
                        error!(url = %source.url, error = %e, "Error during scheduled run")
                    }
                }
            })
        })
        .map_err(|e| CrawlError::InvalidSchedule {
            url: source.url.clone(),
            schedule: source.schedule.clone(),
            reason: e.to_string(),
        })?;

        let job_id = self
            .scheduler
            .add(job)
            .await
            .map_err(scheduler_error)?;
        self.jobs
            .insert(source.url.clone(), ScheduledJobHandle { job_id });
        info!(schedule = %source.schedule, "Scheduled recurring crawl");
        Ok(())
    }

    /// Cancel and drop the job for a url. No-op when none exists. After this
    /// returns, no new ticks fire for the source.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn unregister(&self, url: &str) {
        let _guard = self.lifecycle.lock().await;
        self.cancel(url).await;
    }

    /// Cancel without taking the lifecycle lock; callers hold it already.
    async fn cancel(&self, url: &str) {
        if let Some((_, handle)) = self.jobs.remove(url) {
            info!("Interrupting scheduled crawl for this source");
            if let Err(e) = self.scheduler.remove(&handle.job_id).await {
                // The handle is already gone from the map, so the job cannot
                // be cancelled twice; the scheduler keeps running regardless.
                warn!(error = %e, "Scheduler refused to remove job");
            }
        }
    }

    /// Register every source in the list; used once at startup.
    ///
    /// Each registration is independent: a source with a bad schedule is
    /// logged and skipped, the rest still get their jobs.
    pub async fn bootstrap(&self, sources: &[Source]) -> usize {
        for source in sources {
            if let Err(e) = self.register(source).await {
                error!(url = %source.url, error = %e, "Failed to schedule source");
            }
        }
        let scheduled = self.job_count();
        info!(scheduled, "Scheduled active sources");
        scheduled
    }

    /// Number of live scheduled jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Whether a url currently has a live job.
    #[cfg(test)]
    pub fn is_scheduled(&self, url: &str) -> bool {
        self.jobs.contains_key(url)
    }

    /// Stop the underlying scheduler. Used on process shutdown.
    pub async fn shutdown(&mut self) -> Result<(), CrawlError> {
        self.scheduler.shutdown().await.map_err(scheduler_error)
    }
}

fn scheduler_error(e: tokio_cron_scheduler::JobSchedulerError) -> CrawlError {
    CrawlError::Scheduler(e.to_string())
}

/// Cheap structural check before handing the expression to the scheduler:
/// schedules are 6-field cron (`sec min hour day month weekday`).
fn validate_schedule(source: &Source) -> Result<(), CrawlError> {
    let fields = source.schedule.split_whitespace().count();
    if fields != 6 {
        return Err(CrawlError::InvalidSchedule {
            url: source.url.clone(),
            schedule: source.schedule.clone(),
            reason: format!("expected 6 fields, found {fields}"),
        });
    }
    Ok(())
}
