//! # HTTP Trigger Server
//!
//! Routes `/api/{function}` requests to HTTP-triggered functions.

pub mod config;
pub mod context;
pub mod functions_routes;
pub mod request;
pub mod server;

pub use config::HttpServerConfig;
pub use context::HttpContext;
pub use functions_routes::{authorize, functions_routes, FunctionsState, RouteTable};
pub use request::{HttpRequest, HttpResponseBag};
pub use server::{BoundHttpServer, HttpServer};
