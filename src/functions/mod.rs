//! # Functions
//!
//! Discovery, loading and classification of functions, plus the
//! per-invocation execution context and the cron scheduler.

pub mod context;
pub mod errors;
pub mod function;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod timer_info;
pub mod trigger;

pub use context::{Completion, ExecutionContext, InvocationError, Settlement};
pub use errors::{FunctionError, FunctionResult};
pub use function::{Binding, FunctionConfiguration, FunctionDefinition};
pub use module::{Export, FunctionModule, Invocation, ModuleLoader, NativeLoader, NativeModule};
pub use registry::FunctionRegistry;
pub use runtime::{WasmLoader, WasmModule};
pub use scheduler::{ScheduledJob, Scheduler, Tick};
pub use timer_info::TimerInfo;
pub use trigger::{select_by_trigger_type, Classified, TriggerBinding, TriggerKind};
