//! # WASM Runtime
//!
//! Loads a function's `index.wasm` (or `index.wat`) with wasmtime.
//!
//! Guest contract:
//! - imports `host.log(ptr, len)` and
//!   `host.done(err_ptr, err_len, res_ptr, res_len)`; a zero length means
//!   the argument is absent and `res` is a JSON document;
//! - exports `memory`, `alloc(len) -> ptr`, and an entry point `run` and/or
//!   `default` taking `(ptr, len)` of the JSON invocation document.
//!
//! Every invocation gets a fresh instance.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use wasmtime::{Caller, Engine, Linker, Module, Store};

use super::context::{ExecutionContext, InvocationError};
use super::errors::{FunctionError, FunctionResult};
use super::module::{Export, FunctionModule, Invocation, ModuleLoader};
use super::timer_info::TimerInfo;
use crate::http_server::{HttpContext, HttpRequest, HttpResponseBag};

/// Entry point files, in lookup order
pub const ENTRY_FILES: [&str; 2] = ["index.wasm", "index.wat"];

const MAIN_EXPORT: &str = "run";
const DEFAULT_EXPORT: &str = "default";

/// Loader compiling WebAssembly entry points
#[derive(Clone, Default)]
pub struct WasmLoader {
    engine: Engine,
}

impl WasmLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleLoader for WasmLoader {
    fn load(&self, name: &str, dir: &Path) -> FunctionResult<Arc<dyn FunctionModule>> {
        let path = ENTRY_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
            .ok_or_else(|| FunctionError::entry_point(name, format!("no {} in {}", ENTRY_FILES.join(" or "), dir.display())))?;

        let bytes = fs::read(&path).map_err(|e| FunctionError::entry_point(name, e.to_string()))?;
        let module = WasmModule::compile(&self.engine, name, &bytes)?;

        tracing::debug!(
            event = "WASM_MODULE_LOADED",
            function = %name,
            path = %path.display(),
            digest = %module.digest,
            "Loaded entry point"
        );
        Ok(Arc::new(module))
    }
}

impl fmt::Debug for WasmLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmLoader").finish_non_exhaustive()
    }
}

/// A compiled WebAssembly function
#[derive(Clone)]
pub struct WasmModule {
    name: String,
    engine: Engine,
    module: Module,
    digest: String,
}

impl WasmModule {
    /// Compile binary or text-format WebAssembly
    pub fn compile(engine: &Engine, name: &str, bytes: &[u8]) -> FunctionResult<Self> {
        let module = Module::new(engine, bytes).map_err(|e| FunctionError::entry_point(name, format!("{:#}", e)))?;

        for required in ["memory", "alloc"] {
            if module.get_export(required).is_none() {
                return Err(FunctionError::entry_point(name, format!("module does not export '{}'", required)));
            }
        }
        if module.get_export(MAIN_EXPORT).is_none() && module.get_export(DEFAULT_EXPORT).is_none() {
            return Err(FunctionError::entry_point(
                name,
                format!("module exports neither '{}' nor '{}'", MAIN_EXPORT, DEFAULT_EXPORT),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            engine: engine.clone(),
            module,
            digest: format!("{:x}", Sha256::digest(bytes)),
        })
    }

    /// SHA-256 of the module source
    pub fn digest(&self) -> &str {
        &self.digest
    }

    fn export_name(export: Export) -> &'static str {
        match export {
            Export::Default => DEFAULT_EXPORT,
            Export::Main => MAIN_EXPORT,
        }
    }

    fn linker(&self) -> FunctionResult<Linker<GuestState>> {
        let mut linker = Linker::new(&self.engine);
        linker
            .func_wrap("host", "log", |mut caller: Caller<'_, GuestState>, ptr: i32, len: i32| {
                if let Some(bytes) = read_guest(&mut caller, ptr, len) {
                    caller.data().handle.log(&String::from_utf8_lossy(&bytes));
                }
            })
            .map_err(|e| self.runtime_error("link host.log", e))?;
        linker
            .func_wrap(
                "host",
                "done",
                |mut caller: Caller<'_, GuestState>, err_ptr: i32, err_len: i32, res_ptr: i32, res_len: i32| {
                    let error = read_guest(&mut caller, err_ptr, err_len)
                        .map(|bytes| InvocationError::new(String::from_utf8_lossy(&bytes)));
                    let result = read_guest(&mut caller, res_ptr, res_len)
                        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
                    caller.data().handle.done(error, result);
                },
            )
            .map_err(|e| self.runtime_error("link host.done", e))?;
        Ok(linker)
    }

    fn runtime_error(&self, step: &str, e: impl fmt::Display) -> FunctionError {
        FunctionError::RuntimeError(format!("{}: {} failed: {:#}", self.name, step, e))
    }
}

impl FunctionModule for WasmModule {
    fn has_export(&self, export: Export) -> bool {
        self.module.get_export(Self::export_name(export)).is_some()
    }

    fn invoke(&self, export: Export, invocation: Invocation) -> FunctionResult<()> {
        let export_name = Self::export_name(export);
        let (payload, handle) = guest_payload(invocation)?;
        let linker = self.linker()?;

        let mut store = Store::new(&self.engine, GuestState { handle });
        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| self.runtime_error("instantiate", e))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| self.runtime_error("lookup", "memory export is not a memory"))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .map_err(|e| self.runtime_error("lookup alloc", e))?;
        let entry = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, export_name)
            .map_err(|e| self.runtime_error(export_name, e))?;

        let len = i32::try_from(payload.len()).map_err(|e| self.runtime_error("encode invocation", e))?;
        let ptr = alloc
            .call(&mut store, len)
            .map_err(|e| self.runtime_error("alloc", e))?;
        memory
            .write(&mut store, ptr as usize, &payload)
            .map_err(|e| self.runtime_error("write invocation", e))?;

        entry
            .call(&mut store, (ptr, len))
            .map_err(|e| self.runtime_error(export_name, e))
    }
}

impl fmt::Debug for WasmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmModule")
            .field("name", &self.name)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Completion handle reachable from host functions
enum GuestHandle {
    Task(ExecutionContext),
    Http(HttpContext),
}

impl GuestHandle {
    fn log(&self, message: &str) {
        match self {
            GuestHandle::Task(ctx) => ctx.log(message),
            GuestHandle::Http(ctx) => ctx.log(message),
        }
    }

    fn done(&self, error: Option<InvocationError>, result: Option<Value>) {
        match self {
            GuestHandle::Task(ctx) => ctx.done(error, result),
            GuestHandle::Http(ctx) => {
                let bag = result.and_then(|v| serde_json::from_value::<HttpResponseBag>(v).ok());
                ctx.done(error, bag);
            }
        }
    }
}

struct GuestState {
    handle: GuestHandle,
}

#[derive(Serialize)]
struct GuestInvocation<'a> {
    trigger: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timer: Option<&'a TimerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<&'a HttpRequest>,
}

fn guest_payload(invocation: Invocation) -> FunctionResult<(Vec<u8>, GuestHandle)> {
    let trigger = invocation.trigger().as_str();

    match invocation {
        Invocation::Manual(ctx) => {
            let doc = GuestInvocation { trigger, timer: None, request: None };
            Ok((encode(&doc)?, GuestHandle::Task(ctx)))
        }
        Invocation::Timer(ctx, info) => {
            let doc = GuestInvocation { trigger, timer: Some(&info), request: None };
            Ok((encode(&doc)?, GuestHandle::Task(ctx)))
        }
        Invocation::Http(ctx, req) => {
            let doc = GuestInvocation { trigger, timer: None, request: Some(&req) };
            Ok((encode(&doc)?, GuestHandle::Http(ctx)))
        }
    }
}

fn encode(doc: &GuestInvocation<'_>) -> FunctionResult<Vec<u8>> {
    serde_json::to_vec(doc).map_err(|e| FunctionError::Internal(format!("encode invocation: {}", e)))
}

fn read_guest(caller: &mut Caller<'_, GuestState>, ptr: i32, len: i32) -> Option<Vec<u8>> {
    if len <= 0 || ptr < 0 {
        return None;
    }
    let memory = caller.get_export("memory")?.into_memory()?;
    let mut buffer = vec![0u8; len as usize];
    memory.read(&*caller, ptr as usize, &mut buffer).ok()?;
    Some(buffer)
}
