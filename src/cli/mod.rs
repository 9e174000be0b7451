//! CLI module for fnhost
//!
//! - start: discover functions and serve their triggers
//! - list: print discovered functions and exit

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{list, load_config, run, run_command, start};
pub use errors::{CliError, CliResult};
