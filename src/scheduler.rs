//! Periodic collection.
//!
//! One tokio task per job, each with its own interval, so a slow or failing
//! collector only ever delays itself. Jobs call [`Collector::run`], which
//! absorbs every failure, so a task never exits on its own.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::collect::Collector;
use crate::{HeimdallError, Result};

/// A collector and how often to run it.
#[derive(Clone)]
pub struct Job {
    pub name: String,
    pub interval: Duration,
    pub collector: Arc<dyn Collector>,
}

impl Job {
    pub fn new(interval: Duration, collector: Arc<dyn Collector>) -> Self {
        Self {
            name: collector.name().to_owned(),
            interval,
            collector,
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Drives every job on its own timer.
pub struct Scheduler {
    jobs: Vec<Job>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl Scheduler {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            tasks: Vec::new(),
            started: false,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.tasks.is_empty()
    }

    /// Warm the store by running every job once, in order, then start the
    /// timers. Each job's first timed run is one full interval after this
    /// returns.
    ///
    /// Warm-up failures are logged by the collectors and never abort the
    /// start. A scheduler can only be started once, and every interval must
    /// be non-zero.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(HeimdallError::Configuration(
                "scheduler already started".to_string(),
            ));
        }
        for job in &self.jobs {
            if job.interval.is_zero() {
                return Err(HeimdallError::Configuration(format!(
                    "job '{}' has a zero interval",
                    job.name
                )));
            }
        }
        self.started = true;

        info!(jobs = self.jobs.len(), "warming up collectors");
        for job in &self.jobs {
            job.collector.run().await;
        }

        for job in &self.jobs {
            self.tasks.push(spawn_job(job.clone()));
            info!(job = %job.name, interval_secs = job.interval.as_secs(), "scheduled");
        }
        Ok(())
    }

    /// Stop every timer. Returns immediately; an in-flight collection is
    /// dropped at its next await point.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_job(job: Job) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + job.interval, job.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            debug!(job = %job.name, "tick");
            job.collector.run().await;
        }
    })
}
