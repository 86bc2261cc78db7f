//! Daily job scheduler
//!
//! Jobs are spread over the day by position: the n-th job added runs every
//! day at `n % 24` o'clock local time. [`DailyScheduler::start`] hands the
//! jobs to a cron scheduler and blocks the calling task.

use crate::Result;
use chrono::Local;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

/// Future returned by one run of a job
pub type JobFuture = BoxFuture<'static, Result<()>>;

/// A repeatable job, called once per run
pub type Job = Box<dyn Fn() -> JobFuture + Send + Sync>;

struct ScheduledJob {
    name: String,
    hour: u32,
    job: Arc<Job>,
}

/// Runs each job once a day at its assigned hour
#[derive(Default)]
pub struct DailyScheduler {
    jobs: Vec<ScheduledJob>,
}

impl DailyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds named jobs, assigning hour slots in insertion order
    ///
    /// The slot of a job is its index among all jobs added so far, modulo 24.
    pub fn add_daily_jobs<I>(&mut self, jobs: I)
    where
        I: IntoIterator<Item = (String, Job)>,
    {
        for (name, job) in jobs {
            let hour = (self.jobs.len() % 24) as u32;
            tracing::info!("Scheduling job '{}' daily at {:02}:00", name, hour);
            self.jobs.push(ScheduledJob {
                name,
                hour,
                job: Arc::new(job),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Name and hour slot of every job, in insertion order
    pub fn slots(&self) -> Vec<(&str, u32)> {
        self.jobs
            .iter()
            .map(|job| (job.name.as_str(), job.hour))
            .collect()
    }

    /// Registers the jobs on a cron scheduler and runs them forever
    ///
    /// Returns immediately if no jobs were added. Job errors are logged and
    /// do not stop the scheduler.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - No jobs to run
    /// * `Err(CrawlerError::Scheduler)` - A job could not be registered or the
    ///   scheduler failed to start
    pub async fn start(&self) -> Result<()> {
        if self.jobs.is_empty() {
            tracing::warn!("No jobs scheduled, scheduler exits");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;

        for scheduled in &self.jobs {
            let schedule = cron_expression(scheduled.hour);
            let name = scheduled.name.clone();
            let job = Arc::clone(&scheduled.job);

            let cron_job = CronJob::new_async_tz(schedule.as_str(), Local, move |_uuid, _lock| {
                let name = name.clone();
                let run = (*job)();
                Box::pin(async move {
                    tracing::info!("Running job '{}'", name);
                    if let Err(e) = run.await {
                        tracing::error!("Job '{}' failed: {}", name, e);
                    }
                })
            })?;

            scheduler.add(cron_job).await?;
        }

        scheduler.start().await?;
        tracing::info!("Scheduler started with {} jobs", self.jobs.len());

        // Jobs run on the scheduler's own tasks
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Cron expression firing every day at `hour:00:00`
///
/// Hours above 23 wrap around the day.
pub(crate) fn cron_expression(hour: u32) -> String {
    format!("0 0 {} * * *", hour % 24)
}
