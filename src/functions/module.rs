//! # Function Modules
//!
//! A module is the loaded entry point of one function directory. It is
//! called with an [`Invocation`] whose variant carries the arguments of the
//! trigger that fired: a bare context for manual triggers, a context plus
//! [`TimerInfo`] for timers, and the HTTP handle plus request view for HTTP.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use super::context::ExecutionContext;
use super::errors::{FunctionError, FunctionResult};
use super::timer_info::TimerInfo;
use super::trigger::TriggerKind;
use crate::http_server::{HttpContext, HttpRequest};

/// Arguments of one call into a function
pub enum Invocation {
    Manual(ExecutionContext),
    Timer(ExecutionContext, TimerInfo),
    Http(HttpContext, HttpRequest),
}

impl Invocation {
    pub fn trigger(&self) -> TriggerKind {
        match self {
            Invocation::Manual(_) => TriggerKind::Manual,
            Invocation::Timer(..) => TriggerKind::Timer,
            Invocation::Http(..) => TriggerKind::Http,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Invocation").field(&self.trigger()).finish()
    }
}

/// Which callable of a module to enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    /// A nested default export
    Default,
    /// The module's own callable
    Main,
}

impl fmt::Display for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Default => f.write_str("default"),
            Export::Main => f.write_str("main"),
        }
    }
}

/// A loaded function entry point
pub trait FunctionModule: Send + Sync {
    /// Whether the module provides the given callable
    fn has_export(&self, export: Export) -> bool;

    /// Call into the module
    ///
    /// Returning means the call came back, not that the invocation is done;
    /// completion is signalled through the handle inside `invocation`.
    fn invoke(&self, export: Export, invocation: Invocation) -> FunctionResult<()>;
}

/// HTTP callers prefer a default export and fall back to the module itself
pub fn http_export(module: &dyn FunctionModule) -> Export {
    if module.has_export(Export::Default) {
        Export::Default
    } else {
        Export::Main
    }
}

/// Invoke `module`, turning a panic into a runtime error
pub fn invoke_guarded(
    module: &dyn FunctionModule,
    export: Export,
    invocation: Invocation,
) -> FunctionResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| module.invoke(export, invocation))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "function panicked".to_string());
            Err(FunctionError::RuntimeError(message))
        }
    }
}

/// Native handler signature
pub type Handler = Arc<dyn Fn(Invocation) -> FunctionResult<()> + Send + Sync>;

/// A function implemented as an in-process Rust closure
#[derive(Clone, Default)]
pub struct NativeModule {
    main: Option<Handler>,
    default: Option<Handler>,
}

impl NativeModule {
    /// Module whose own callable is `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Invocation) -> FunctionResult<()> + Send + Sync + 'static,
    {
        Self {
            main: Some(Arc::new(handler)),
            default: None,
        }
    }

    /// Add a default export
    pub fn with_default<F>(mut self, handler: F) -> Self
    where
        F: Fn(Invocation) -> FunctionResult<()> + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(handler));
        self
    }

    /// A `(context)` function. Timer invocations are accepted too; the
    /// timer info is dropped.
    pub fn manual<F>(f: F) -> Self
    where
        F: Fn(ExecutionContext) + Send + Sync + 'static,
    {
        Self::new(move |invocation| match invocation {
            Invocation::Manual(ctx) | Invocation::Timer(ctx, _) => {
                f(ctx);
                Ok(())
            }
            other => Err(shape_mismatch("(context)", &other)),
        })
    }

    /// A `(context, timerInfo)` function
    pub fn timer<F>(f: F) -> Self
    where
        F: Fn(ExecutionContext, TimerInfo) + Send + Sync + 'static,
    {
        Self::new(move |invocation| match invocation {
            Invocation::Timer(ctx, info) => {
                f(ctx, info);
                Ok(())
            }
            other => Err(shape_mismatch("(context, timerInfo)", &other)),
        })
    }

    /// A `(context, request)` function exported as the module itself
    pub fn http<F>(f: F) -> Self
    where
        F: Fn(HttpContext, HttpRequest) + Send + Sync + 'static,
    {
        Self::new(http_handler(f))
    }

    /// A `(context, request)` function exported under `default`
    pub fn http_default<F>(f: F) -> Self
    where
        F: Fn(HttpContext, HttpRequest) + Send + Sync + 'static,
    {
        Self::default().with_default(http_handler(f))
    }

    fn handler(&self, export: Export) -> Option<&Handler> {
        match export {
            Export::Default => self.default.as_ref(),
            Export::Main => self.main.as_ref(),
        }
    }
}

fn http_handler<F>(f: F) -> impl Fn(Invocation) -> FunctionResult<()> + Send + Sync + 'static
where
    F: Fn(HttpContext, HttpRequest) + Send + Sync + 'static,
{
    move |invocation| match invocation {
        Invocation::Http(ctx, req) => {
            f(ctx, req);
            Ok(())
        }
        other => Err(shape_mismatch("(context, request)", &other)),
    }
}

fn shape_mismatch(shape: &str, invocation: &Invocation) -> FunctionError {
    FunctionError::InvalidTrigger(format!(
        "{} function cannot handle a {} invocation",
        shape,
        invocation.trigger()
    ))
}

impl FunctionModule for NativeModule {
    fn has_export(&self, export: Export) -> bool {
        self.handler(export).is_some()
    }

    fn invoke(&self, export: Export, invocation: Invocation) -> FunctionResult<()> {
        let handler = self
            .handler(export)
            .ok_or_else(|| FunctionError::RuntimeError(format!("module has no {} export", export)))?;
        handler(invocation)
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("main", &self.main.is_some())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Turns a function directory into a module
pub trait ModuleLoader: Send + Sync {
    fn load(&self, name: &str, dir: &Path) -> FunctionResult<Arc<dyn FunctionModule>>;
}

/// Loader serving modules registered in-process, keyed by function name
#[derive(Default)]
pub struct NativeLoader {
    modules: HashMap<String, Arc<dyn FunctionModule>>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the module for the function directory named `name`
    pub fn register(mut self, name: impl Into<String>, module: impl FunctionModule + 'static) -> Self {
        self.modules.insert(name.into(), Arc::new(module));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, name: &str, _dir: &Path) -> FunctionResult<Arc<dyn FunctionModule>> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| FunctionError::entry_point(name, "no native module registered"))
    }
}
