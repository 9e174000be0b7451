//! CLI argument definitions using clap
//!
//! Commands:
//! - fnhost start [--config <path>] [--root <dir>] [--port <n>] [--key <k>]...
//! - fnhost list [--config <path>] [--root <dir>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fnhost - run a directory of functions locally
#[derive(Parser, Debug)]
#[command(name = "fnhost")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover functions and serve their triggers until Ctrl-C
    Start {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Functions root (overrides the config file)
        #[arg(long)]
        root: Option<PathBuf>,

        /// HTTP port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,

        /// Accepted function key, may be repeated
        #[arg(long = "key")]
        keys: Vec<String>,

        /// Emit JSON log lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Print every discovered function as a JSON line and exit
    List {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Functions root (overrides the config file)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_flags() {
        let cli = Cli::try_parse_from([
            "fnhost", "start", "--root", "fns", "--port", "7071", "--key", "a", "--key", "b", "--json-logs",
        ])
        .unwrap();

        match cli.command {
            Command::Start {
                config,
                root,
                port,
                keys,
                json_logs,
            } => {
                assert!(config.is_none());
                assert_eq!(root, Some(PathBuf::from("fns")));
                assert_eq!(port, Some(7071));
                assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
                assert!(json_logs);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_with_config() {
        let cli = Cli::try_parse_from(["fnhost", "list", "--config", "host.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List { config: Some(_), root: None }
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["fnhost", "start", "--port", "99999"]).is_err());
    }
}
