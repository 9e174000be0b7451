//! Timer triggers: one scheduler job per function, a fresh context and
//! timer info on every tick.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::invoke_and_report;
use crate::functions::context::ExecutionContext;
use crate::functions::errors::{FunctionError, FunctionResult};
use crate::functions::function::FunctionDefinition;
use crate::functions::module::Invocation;
use crate::functions::scheduler::{ScheduledJob, Scheduler, Tick};
use crate::functions::timer_info::TimerInfo;
use crate::functions::trigger::TriggerBinding;

/// Register every timer function with `scheduler`
///
/// All schedules are validated before the first job starts, so a bad
/// schedule arms nothing.
pub fn arm_timer_triggers(triggers: &[TriggerBinding], scheduler: &Scheduler) -> FunctionResult<Vec<Uuid>> {
    let jobs = triggers
        .iter()
        .map(|trigger| {
            let schedule = trigger.binding.schedule.as_deref().ok_or_else(|| {
                FunctionError::InvalidTrigger(format!(
                    "timer function '{}' has no schedule",
                    trigger.function.name
                ))
            })?;
            Ok((trigger.function.clone(), ScheduledJob::new(&trigger.function.name, schedule)?))
        })
        .collect::<FunctionResult<Vec<_>>>()?;

    let mut ids = Vec::with_capacity(jobs.len());
    for (function, job) in jobs {
        tracing::info!(
            event = "TIMER_FUNCTION_SCHEDULED",
            function = %function.name,
            schedule = %job.cron,
            "Scheduled timer function '{}' to '{}'",
            function.name,
            job.cron
        );
        let cron = job.cron.clone();
        let callback = Arc::new(move |tick: Tick| {
            fire_timer(&function, &cron, tick);
        });
        ids.push(scheduler.schedule(job, callback)?);
    }
    Ok(ids)
}

/// Run one tick of a timer function
pub fn fire_timer(function: &Arc<FunctionDefinition>, schedule: &str, tick: Tick) -> JoinHandle<()> {
    let (context, completion) = ExecutionContext::new(function.clone());
    let info = TimerInfo::new(schedule, tick.scheduled_at, tick.fired_at);
    invoke_and_report(function, context.clone(), completion, Invocation::Timer(context, info))
}
