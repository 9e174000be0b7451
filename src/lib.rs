//! fnhost - a local host for directory-based serverless functions
//!
//! Functions live in directories holding a `function.json` manifest and an
//! entry point. The host discovers them, runs manual triggers once at
//! startup, fires timer triggers on their cron schedule and serves HTTP
//! triggers under `/api/{function}`.

pub mod cli;
pub mod functions;
pub mod host;
pub mod http_server;
pub mod observability;
pub mod runners;

pub use host::{start, Host, HostConfig, HostError};
