//! # Execution Context
//!
//! Per-invocation handle a function uses to log and to signal completion.
//! The completion side is a write-once cell: the first `done` settles it and
//! every later call is ignored.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::errors::FunctionError;
use super::function::FunctionDefinition;

/// Failure reported by a function through `done`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationError {
    message: String,
    stack: Option<String>,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Attach a stack/backtrace; it replaces the message as rejection reason
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Rejection reason: the stack when present, else the message
    pub fn reason(&self) -> &str {
        self.stack.as_deref().unwrap_or(&self.message)
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl From<&str> for InvocationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for InvocationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<FunctionError> for InvocationError {
    fn from(e: FunctionError) -> Self {
        Self::new(e.to_string())
    }
}

/// Final state of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// `done` was called without an error
    Fulfilled,
    /// `done` was called with an error; carries the rejection reason
    Rejected(String),
    /// Every handle was dropped without calling `done`
    Abandoned,
}

/// Future side of an execution context
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<(), String>>,
}

impl Completion {
    /// Wait for the context to settle
    pub async fn settled(self) -> Settlement {
        match self.rx.await {
            Ok(outcome) => Self::settlement(outcome),
            Err(_) => Settlement::Abandoned,
        }
    }

    /// Settlement if it already happened
    pub fn try_settled(&mut self) -> Option<Settlement> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(Self::settlement(outcome)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Settlement::Abandoned),
        }
    }

    fn settlement(outcome: Result<(), String>) -> Settlement {
        match outcome {
            Ok(()) => Settlement::Fulfilled,
            Err(reason) => Settlement::Rejected(reason),
        }
    }
}

struct ContextInner {
    invocation_id: Uuid,
    function: Arc<FunctionDefinition>,
    completion: Mutex<Option<oneshot::Sender<Result<(), String>>>>,
}

/// Completion and logging handle for manual and timer invocations
///
/// Cheap to clone; clones share the same completion cell.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Create a fresh context and its completion future
    pub fn new(function: Arc<FunctionDefinition>) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let context = Self {
            inner: Arc::new(ContextInner {
                invocation_id: Uuid::new_v4(),
                function,
                completion: Mutex::new(Some(tx)),
            }),
        };
        (context, Completion { rx })
    }

    pub fn invocation_id(&self) -> Uuid {
        self.inner.invocation_id
    }

    pub fn function(&self) -> &FunctionDefinition {
        &self.inner.function
    }

    /// Emit a line prefixed with the owning function's name
    pub fn log(&self, message: &str) {
        self.emit(message.to_string());
    }

    /// Emit a line after substituting `args` into `message`
    pub fn log_args(&self, message: &str, args: &[Value]) {
        self.emit(format_message(message, args));
    }

    fn emit(&self, message: String) {
        let name = &self.inner.function.name;
        let line = if name.is_empty() {
            message
        } else {
            format!("{}: {}", name, message)
        };
        tracing::info!(
            target: "fnhost::function",
            invocation_id = %self.inner.invocation_id,
            "{}",
            line
        );
    }

    /// Settle the invocation
    ///
    /// An error rejects with its reason, anything else fulfils; the result
    /// value is ignored. Only the first call has an effect.
    pub fn done(&self, error: Option<InvocationError>, _result: Option<Value>) {
        let Some(tx) = self.lock().take() else {
            return;
        };
        let outcome = match error {
            Some(e) => Err(e.reason().to_string()),
            None => Ok(()),
        };
        // Receiver gone means nobody is waiting on the outcome anymore
        let _ = tx.send(outcome);
    }

    /// Shorthand for `done(None, None)`
    pub fn succeed(&self) {
        self.done(None, None);
    }

    /// Shorthand for `done(Some(error), None)`
    pub fn fail(&self, error: impl Into<InvocationError>) {
        self.done(Some(error.into()), None);
    }

    pub fn is_settled(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<Result<(), String>>>> {
        self.inner
            .completion
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("invocation_id", &self.inner.invocation_id)
            .field("function", &self.inner.function.name)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Substitute `%s`, `%d`, `%i`, `%f`, `%j`, `%o` placeholders in order;
/// leftover arguments are appended separated by spaces. `%%` is a literal `%`.
pub fn format_message(message: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(message.len());
    let mut args = args.iter();
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o')) => match args.next() {
                Some(arg) => {
                    chars.next();
                    out.push_str(&render_arg(spec, arg));
                }
                None => out.push('%'),
            },
            _ => out.push('%'),
        }
    }

    for arg in args {
        out.push(' ');
        out.push_str(&render_arg('s', arg));
    }
    out
}

fn render_arg(spec: char, arg: &Value) -> String {
    match (spec, arg) {
        ('s', Value::String(s)) => s.clone(),
        ('d' | 'i', Value::Number(n)) => match n.as_f64() {
            Some(f) if spec == 'i' => (f.trunc() as i64).to_string(),
            _ => n.to_string(),
        },
        ('d' | 'i' | 'f', _) => "NaN".to_string(),
        _ => arg.to_string(),
    }
}
