//! # Function Scheduler
//!
//! Runs a callback at every instant matching a cron expression. Each job is
//! one tokio task; ticks are handed to the callback as they come and are
//! never queued behind a still-running invocation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, Utc};
use croner::Cron;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::errors::{FunctionError, FunctionResult};

/// One firing of a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Instant the cron expression matched
    pub scheduled_at: DateTime<Utc>,
    /// Instant the callback was entered
    pub fired_at: DateTime<Utc>,
}

/// Callback run on every tick
pub type TickCallback = Arc<dyn Fn(Tick) + Send + Sync>;

/// A scheduled job
#[derive(Clone)]
pub struct ScheduledJob {
    /// Job ID
    pub id: Uuid,

    /// Function name
    pub function_name: String,

    /// Cron expression
    pub cron: String,

    schedule: Cron,
}

impl ScheduledJob {
    /// Create a new scheduled job
    ///
    /// Accepts five fields, or six with leading seconds.
    pub fn new(function_name: impl Into<String>, cron: impl Into<String>) -> FunctionResult<Self> {
        let cron = cron.into();
        let schedule = Cron::new(&cron)
            .with_seconds_optional()
            .parse()
            .map_err(|e| FunctionError::InvalidCron(format!("'{}': {}", cron, e)))?;

        Ok(Self {
            id: Uuid::new_v4(),
            function_name: function_name.into(),
            cron,
            schedule,
        })
    }

    /// First matching instant strictly after `after`
    pub fn next_after(&self, after: &DateTime<Local>) -> FunctionResult<DateTime<Local>> {
        self.schedule
            .find_next_occurrence(after, false)
            .map_err(|e| FunctionError::InvalidCron(format!("'{}': {}", self.cron, e)))
    }
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("id", &self.id)
            .field("function_name", &self.function_name)
            .field("cron", &self.cron)
            .finish()
    }
}

struct RunningJob {
    job: ScheduledJob,
    handle: JoinHandle<()>,
}

/// Job scheduler
///
/// Dropping the scheduler cancels every job.
#[derive(Default)]
pub struct Scheduler {
    jobs: Mutex<HashMap<Uuid, RunningJob>>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Start firing `callback` for `job`; must run inside a tokio runtime
    pub fn schedule(&self, job: ScheduledJob, callback: TickCallback) -> FunctionResult<Uuid> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| FunctionError::Internal(format!("scheduler needs a tokio runtime: {}", e)))?;

        let id = job.id;
        let handle = runtime.spawn(run_job(job.clone(), callback));
        self.lock().insert(id, RunningJob { job, handle });
        Ok(id)
    }

    /// Cancel a job
    pub fn cancel(&self, job_id: Uuid) -> FunctionResult<()> {
        let running = self
            .lock()
            .remove(&job_id)
            .ok_or_else(|| FunctionError::NotFound(job_id.to_string()))?;
        running.handle.abort();
        Ok(())
    }

    /// Cancel every job
    pub fn shutdown(&self) {
        for (_, running) in self.lock().drain() {
            running.handle.abort();
        }
    }

    /// Scheduled jobs, in no particular order
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.lock().values().map(|r| r.job.clone()).collect()
    }

    /// Get job count
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, RunningJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").field("jobs", &self.len()).finish()
    }
}

async fn run_job(job: ScheduledJob, callback: TickCallback) {
    let mut after = Local::now();
    loop {
        let next = match job.next_after(&after) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(
                    event = "SCHEDULE_EXHAUSTED",
                    function = %job.function_name,
                    error = %e,
                    "No further occurrences"
                );
                return;
            }
        };

        let wait = (next - Local::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        callback(Tick {
            scheduled_at: next.with_timezone(&Utc),
            fired_at: Utc::now(),
        });

        // An early wake-up must not match the same instant twice
        after = std::cmp::max(next, Local::now());
    }
}
