//! Functions HTTP Routes
//!
//! Maps `/api/{function}` requests onto HTTP-triggered functions. Every
//! request goes through the same steps in order: buffer the body, pick the
//! route, check authorization, invoke, wait for the function's `done`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use futures_util::StreamExt;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use super::context::HttpContext;
use super::request::{HttpRequest, HttpResponseBag};
use crate::functions::function::Binding;
use crate::functions::module::{http_export, invoke_guarded, Invocation};
use crate::functions::trigger::TriggerBinding;

/// Query parameter carrying a function key
pub const CODE_PARAM: &str = "code";

/// Header carrying a function key
pub const KEY_HEADER: &str = "x-functions-key";

/// Prefix every function route lives under
pub const API_PREFIX: &str = "/api/";

/// One `/api/{segment}` route
#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub trigger: TriggerBinding,
}

/// HTTP-triggered functions in registration order
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build the table, logging each mapping
    pub fn new(triggers: Vec<TriggerBinding>) -> Self {
        let routes = triggers
            .into_iter()
            .map(|trigger| {
                let prefix = format!("{}{}", API_PREFIX, trigger.function.route_segment());
                tracing::info!(
                    event = "HTTP_FUNCTION_MAPPED",
                    function = %trigger.function.name,
                    route = %prefix,
                    "HTTP function '{}' mapped",
                    prefix
                );
                Route { prefix, trigger }
            })
            .collect();
        Self { routes }
    }

    /// First route whose prefix starts `url`
    ///
    /// Plain string prefix: `/api/foo` also claims `/api/foobar` when it was
    /// registered first.
    pub fn select(&self, url: &str) -> Option<&Route> {
        self.routes.iter().find(|route| url.starts_with(&route.prefix))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Whether a request for `binding` may proceed
///
/// Anonymous bindings always pass; otherwise the credential must be an
/// exact member of `keys`.
pub fn authorize(binding: &Binding, credential: Option<&str>, keys: &[String]) -> bool {
    if binding.is_anonymous() {
        return true;
    }
    match credential {
        Some(code) if !code.is_empty() => keys.iter().any(|key| key == code),
        _ => false,
    }
}

/// State shared by every request
#[derive(Debug, Default)]
pub struct FunctionsState {
    pub routes: RouteTable,
    pub keys: Vec<String>,
}

impl FunctionsState {
    pub fn new(routes: RouteTable, keys: Vec<String>) -> Self {
        Self { routes, keys }
    }
}

/// Router sending every request through [`dispatch`]
pub fn functions_routes(state: Arc<FunctionsState>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(state): State<Arc<FunctionsState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let body = match collect_body(body).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(event = "HTTP_BODY_ERROR", error = %e, "Failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let original_url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let Some(route) = state.routes.select(&original_url) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let function = &route.trigger.function;
    tracing::info!(
        event = "HTTP_FUNCTION_TRIGGERED",
        function = %function.name,
        "HTTP function '{}{}' triggered",
        API_PREFIX,
        function.name
    );

    let pairs = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();

    if !authorize(&route.trigger.binding, credential(&pairs, &parts), &state.keys) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(
                    event = "HTTP_FUNCTION_ERROR",
                    function = %function.name,
                    error = %e,
                    "HTTP function '{}' - request body is not JSON",
                    function.name
                );
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    let request = HttpRequest {
        method: parts.method.as_str().to_string(),
        original_url,
        query: pairs.into_iter().collect::<BTreeMap<_, _>>(),
        body,
    };

    let (context, response) = HttpContext::new(function.name.clone());
    let guard = context.clone();
    let module = function.module.as_ref();

    if let Err(e) = invoke_guarded(module, http_export(module), Invocation::Http(context, request)) {
        tracing::error!(
            event = "HTTP_FUNCTION_ERROR",
            function = %function.name,
            error = %e,
            "HTTP function '{}' - error: {}",
            function.name,
            e
        );
        guard.respond_status(500);
    }
    drop(guard);

    match response.await {
        Ok(bag) => into_response(&function.name, bag),
        Err(_) => {
            tracing::error!(
                event = "HTTP_FUNCTION_ABANDONED",
                function = %function.name,
                "HTTP function '{}' dropped its context without calling done",
                function.name
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn collect_body(body: Body) -> Result<Vec<u8>, axum::Error> {
    let mut buffer = Vec::new();
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

/// Key presented by the caller
///
/// A non-empty `code` query parameter wins over the header. A repeated
/// `code` presents no usable key at all.
fn credential<'a>(pairs: &'a [(String, String)], parts: &'a Parts) -> Option<&'a str> {
    let mut codes = pairs.iter().filter(|(k, _)| k == CODE_PARAM).map(|(_, v)| v.as_str());
    match (codes.next(), codes.next()) {
        (Some(_), Some(_)) => None,
        (Some(code), None) if !code.is_empty() => Some(code),
        _ => parts.headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()),
    }
}

fn into_response(function: &str, bag: HttpResponseBag) -> Response {
    let status = match bag.status {
        None => StatusCode::OK,
        Some(code) => match StatusCode::from_u16(code) {
            Ok(status) => status,
            Err(_) => {
                tracing::error!(
                    event = "HTTP_FUNCTION_ERROR",
                    function = %function,
                    status = code,
                    "HTTP function '{}' - invalid status {}",
                    function,
                    code
                );
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    match bag.body {
        None | Some(Value::Null) => status.into_response(),
        Some(Value::String(text)) => (status, text).into_response(),
        Some(other) => (status, Json(other)).into_response(),
    }
}
