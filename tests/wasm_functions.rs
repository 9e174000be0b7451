//! WebAssembly Function Tests
//!
//! Functions whose entry point is an `index.wat` next to the manifest,
//! loaded with the wasmtime loader:
//! - The invocation document handed to the guest
//! - `host.done` settling manual/timer contexts and HTTP responses
//! - Traps surfacing as failures

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use fnhost::functions::{
    Classified, Export, ExecutionContext, FunctionError, FunctionRegistry, Invocation, Settlement, TimerInfo,
    WasmLoader,
};
use fnhost::http_server::{functions_routes, FunctionsState, RouteTable};

// =============================================================================
// Guest Modules
// =============================================================================

/// Rejects with the invocation document as the reason.
const ECHO_AS_ERROR: &str = r#"
(module
  (import "host" "done" (func $done (param i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (func (export "alloc") (param i32) (result i32) i32.const 1024)
  (func (export "run") (param $ptr i32) (param $len i32)
    (call $done (local.get $ptr) (local.get $len) (i32.const 0) (i32.const 0))))
"#;

/// Logs its input, then answers `{"status":201,"body":"ok"}` from `default`.
const HTTP_CREATED: &str = r#"
(module
  (import "host" "log" (func $log (param i32 i32)))
  (import "host" "done" (func $done (param i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{\"status\":201,\"body\":\"ok\"}")
  (func (export "alloc") (param i32) (result i32) i32.const 1024)
  (func (export "default") (param $ptr i32) (param $len i32)
    (call $log (local.get $ptr) (local.get $len))
    (call $done (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 26))))
"#;

/// Succeeds without a result.
const SUCCEED: &str = r#"
(module
  (import "host" "done" (func $done (param i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (func (export "alloc") (param i32) (result i32) i32.const 1024)
  (func (export "run") (param i32 i32)
    (call $done (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))))
"#;

const TRAP: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "alloc") (param i32) (result i32) i32.const 1024)
  (func (export "run") (param i32 i32) unreachable))
"#;

/// Returns without ever calling `host.done`.
const SILENT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "alloc") (param i32) (result i32) i32.const 1024)
  (func (export "run") (param i32 i32)))
"#;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_function(root: &Path, name: &str, manifest: &str, wat: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("function.json"), manifest).unwrap();
    fs::write(dir.join("index.wat"), wat).unwrap();
}

const MANUAL: &str = r#"{"bindings": [{"type": "manualTrigger"}]}"#;
const HTTP: &str = r#"{"bindings": [{"type": "httpTrigger", "authLevel": "anonymous"}]}"#;

fn discover(root: &Path) -> FunctionRegistry {
    FunctionRegistry::discover(root, &WasmLoader::new()).unwrap()
}

async fn status_of(root: &Path, uri: &str) -> (StatusCode, String) {
    let classified = Classified::from_registry(&discover(root));
    let router = functions_routes(Arc::new(FunctionsState::new(RouteTable::new(classified.http), Vec::new())));
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

// =============================================================================
// Manual & Timer Tests
// =============================================================================

#[tokio::test]
async fn test_manual_invocation_document() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "echo", MANUAL, ECHO_AS_ERROR);
    let function = discover(tmp.path()).get("echo").unwrap();

    let (ctx, completion) = ExecutionContext::new(function.clone());
    function.module.invoke(Export::Main, Invocation::Manual(ctx)).unwrap();

    let Settlement::Rejected(reason) = completion.settled().await else {
        panic!("expected rejection");
    };
    let doc: Value = serde_json::from_str(&reason).unwrap();
    assert_eq!(doc, serde_json::json!({"trigger": "manualTrigger"}));
}

#[tokio::test]
async fn test_timer_invocation_carries_timer_info() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "echo", MANUAL, ECHO_AS_ERROR);
    let function = discover(tmp.path()).get("echo").unwrap();

    let now = Utc::now();
    let info = TimerInfo::new("0 */5 * * * *", now, now);
    let (ctx, completion) = ExecutionContext::new(function.clone());
    function.module.invoke(Export::Main, Invocation::Timer(ctx, info)).unwrap();

    let Settlement::Rejected(reason) = completion.settled().await else {
        panic!("expected rejection");
    };
    let doc: Value = serde_json::from_str(&reason).unwrap();
    assert_eq!(doc["trigger"], "timerTrigger");
    assert_eq!(doc["timer"]["schedule"], "0 */5 * * * *");
    assert_eq!(doc["timer"]["isPastDue"], false);
}

#[tokio::test]
async fn test_done_without_error_fulfills() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "ok", MANUAL, SUCCEED);
    let function = discover(tmp.path()).get("ok").unwrap();

    let (ctx, completion) = ExecutionContext::new(function.clone());
    function.module.invoke(Export::Main, Invocation::Manual(ctx)).unwrap();
    assert_eq!(completion.settled().await, Settlement::Fulfilled);
}

#[tokio::test]
async fn test_trap_is_runtime_error() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "trap", MANUAL, TRAP);
    let function = discover(tmp.path()).get("trap").unwrap();

    let (ctx, _completion) = ExecutionContext::new(function.clone());
    let err = function.module.invoke(Export::Main, Invocation::Manual(ctx)).unwrap_err();
    assert!(matches!(err, FunctionError::RuntimeError(_)));
}

#[tokio::test]
async fn test_silent_guest_abandons_context() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "silent", MANUAL, SILENT);
    let function = discover(tmp.path()).get("silent").unwrap();

    let (ctx, completion) = ExecutionContext::new(function.clone());
    function.module.invoke(Export::Main, Invocation::Manual(ctx)).unwrap();
    assert_eq!(completion.settled().await, Settlement::Abandoned);
}

// =============================================================================
// HTTP Tests
// =============================================================================

#[tokio::test]
async fn test_http_default_export_responds() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "hello", HTTP, HTTP_CREATED);

    let (status, body) = status_of(tmp.path(), "/api/hello?name=wasm").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_http_trap_is_500() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "trap", HTTP, TRAP);

    let (status, _) = status_of(tmp.path(), "/api/trap").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_http_guest_without_done_is_500() {
    let tmp = TempDir::new().unwrap();
    write_function(tmp.path(), "silent", HTTP, SILENT);

    let (status, _) = status_of(tmp.path(), "/api/silent").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
