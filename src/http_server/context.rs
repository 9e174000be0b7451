//! Completion handle for HTTP invocations
//!
//! Lighter than the execution context: no completion future, `done` ends
//! the HTTP response instead. Only the first `done` is honoured, so a
//! response is never ended twice.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;

use super::request::HttpResponseBag;
use crate::functions::context::{format_message, InvocationError};

struct HttpContextInner {
    function_name: String,
    res: Mutex<HttpResponseBag>,
    binary: Mutex<Option<PathBuf>>,
    responder: Mutex<Option<oneshot::Sender<HttpResponseBag>>>,
}

/// Handle given to HTTP functions
#[derive(Clone)]
pub struct HttpContext {
    inner: Arc<HttpContextInner>,
}

/// Receiving end of an [`HttpContext`]
pub type ResponseReceiver = oneshot::Receiver<HttpResponseBag>;

impl HttpContext {
    pub fn new(function_name: impl Into<String>) -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        let context = Self {
            inner: Arc::new(HttpContextInner {
                function_name: function_name.into(),
                res: Mutex::new(HttpResponseBag::default()),
                binary: Mutex::new(None),
                responder: Mutex::new(Some(tx)),
            }),
        };
        (context, rx)
    }

    pub fn function_name(&self) -> &str {
        &self.inner.function_name
    }

    /// Emit a line prefixed with the function's name
    pub fn log(&self, message: &str) {
        self.emit(message.to_string());
    }

    /// Emit a line after substituting `args` into `message`
    pub fn log_args(&self, message: &str, args: &[Value]) {
        self.emit(format_message(message, args));
    }

    fn emit(&self, message: String) {
        let name = &self.inner.function_name;
        let line = if name.is_empty() {
            message
        } else {
            format!("{}: {}", name, message)
        };
        tracing::info!(target: "fnhost::function", "{}", line);
    }

    /// Current working response state
    pub fn res(&self) -> HttpResponseBag {
        lock(&self.inner.res).clone()
    }

    /// Replace the working response state
    pub fn set_res(&self, res: HttpResponseBag) {
        *lock(&self.inner.res) = res;
    }

    /// Temporary file belonging to the request, removed once responded
    pub fn set_binary(&self, path: impl Into<PathBuf>) {
        *lock(&self.inner.binary) = Some(path.into());
    }

    /// End the response
    ///
    /// A given `res` replaces the working state first. Writes `status`
    /// (200 when unset) and `body`. An error is logged; the response is
    /// still written from the working state.
    pub fn done(&self, error: Option<InvocationError>, res: Option<HttpResponseBag>) {
        let Some(tx) = lock(&self.inner.responder).take() else {
            return;
        };

        if let Some(e) = error {
            tracing::error!(
                event = "HTTP_FUNCTION_ERROR",
                function = %self.inner.function_name,
                error = %e,
                "HTTP function '{}' - error: {}",
                self.inner.function_name,
                e
            );
        }
        if let Some(res) = res {
            self.set_res(res);
        }

        // Receiver gone means the client connection was dropped
        let _ = tx.send(self.res());
        self.remove_binary();
    }

    /// Respond with `status` unless the function already responded
    pub fn respond_status(&self, status: u16) {
        self.done(None, Some(HttpResponseBag::status(status)));
    }

    pub fn is_done(&self) -> bool {
        lock(&self.inner.responder).is_none()
    }

    fn remove_binary(&self) {
        let Some(path) = lock(&self.inner.binary).take() else {
            return;
        };
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(
                    event = "HTTP_BINARY_CLEANUP_FAILED",
                    path = %path.display(),
                    error = %e,
                    "Could not remove request file"
                );
            }
        }
    }
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContext")
            .field("function", &self.inner.function_name)
            .field("done", &self.is_done())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
