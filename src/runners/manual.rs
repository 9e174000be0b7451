//! Manual triggers: startup tasks run once, concurrently, fire-and-forget.

use tokio::task::JoinHandle;

use super::invoke_and_report;
use crate::functions::context::ExecutionContext;
use crate::functions::module::Invocation;
use crate::functions::trigger::TriggerBinding;

/// Invoke every manual function once
///
/// Returns the reporting tasks; the host does not wait on them.
pub fn run_manual_triggers(triggers: &[TriggerBinding]) -> Vec<JoinHandle<()>> {
    triggers
        .iter()
        .map(|trigger| {
            let (context, completion) = ExecutionContext::new(trigger.function.clone());
            invoke_and_report(
                &trigger.function,
                context.clone(),
                completion,
                Invocation::Manual(context),
            )
        })
        .collect()
}
