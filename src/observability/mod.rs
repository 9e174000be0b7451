//! Logging setup
//!
//! Lines of WARN and above go to stderr, everything else to stdout.
//! `RUST_LOG` overrides the default `info` filter.

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Returns `false` when one was already installed.
pub fn init(json: bool) -> bool {
    let writer = std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout);
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter()).with_writer(writer);

    let installed = if json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.with_target(false).try_init()
    };
    installed.is_ok()
}
