//! # Trigger Runners
//!
//! Manual and timer triggers share one invocation path: log a start line,
//! call the function with a fresh execution context, then report the
//! settlement from a separate task so the caller never waits on it.

pub mod manual;
pub mod timer;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::functions::context::{Completion, ExecutionContext, Settlement};
use crate::functions::function::FunctionDefinition;
use crate::functions::module::{invoke_guarded, Export, Invocation};
use crate::functions::trigger::TriggerKind;

pub use manual::run_manual_triggers;
pub use timer::{arm_timer_triggers, fire_timer};

/// Wording used in log lines for each runner
fn label(kind: TriggerKind) -> (&'static str, &'static str) {
    match kind {
        TriggerKind::Manual => ("Manual", "MANUAL"),
        TriggerKind::Timer => ("Scheduled", "TIMER"),
        TriggerKind::Http => ("HTTP", "HTTP"),
    }
}

/// Call `function` and spawn the task reporting how it settled
///
/// `context` is the runner's own handle to the context inside
/// `invocation`. A call that fails outright (module error, panic, trap)
/// rejects it, unless the function already settled it.
pub(crate) fn invoke_and_report(
    function: &Arc<FunctionDefinition>,
    context: ExecutionContext,
    completion: Completion,
    invocation: Invocation,
) -> JoinHandle<()> {
    let kind = invocation.trigger();
    let (noun, tag) = label(kind);
    let invocation_id = context.invocation_id();

    tracing::info!(
        event = %format!("{}_FUNCTION_START", tag),
        function = %function.name,
        %invocation_id,
        "{} function '{}' - start",
        noun,
        function.name
    );

    if let Err(e) = invoke_guarded(function.module.as_ref(), Export::Main, invocation) {
        context.fail(e);
    }
    drop(context);

    let name = function.name.clone();
    tokio::spawn(async move {
        match completion.settled().await {
            Settlement::Fulfilled => tracing::info!(
                event = %format!("{}_FUNCTION_FINISH", tag),
                function = %name,
                %invocation_id,
                "{} function '{}' - finish",
                noun,
                name
            ),
            Settlement::Rejected(reason) => tracing::error!(
                event = %format!("{}_FUNCTION_ERROR", tag),
                function = %name,
                %invocation_id,
                "{} function '{}' - error: {}",
                noun,
                name,
                reason
            ),
            Settlement::Abandoned => tracing::warn!(
                event = %format!("{}_FUNCTION_ABANDONED", tag),
                function = %name,
                %invocation_id,
                "{} function '{}' - dropped its context without calling done",
                noun,
                name
            ),
        }
    })
}
