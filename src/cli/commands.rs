//! CLI command implementations

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::functions::registry::{install_dir, resolve_root};
use crate::functions::{FunctionDefinition, FunctionRegistry, TriggerKind, WasmLoader};
use crate::host::{Host, HostConfig};
use crate::observability;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start {
            config,
            root,
            port,
            keys,
            json_logs,
        } => {
            let mut host = load_config(config.as_deref(), root)?;
            if let Some(port) = port {
                host.http.port = port;
            }
            if !keys.is_empty() {
                host.http.keys = keys;
            }
            host.log_json |= json_logs;
            start(host)
        }
        Command::List { config, root } => {
            let host = load_config(config.as_deref(), root)?;
            list(&host, &mut io::stdout().lock())
        }
    }
}

/// Read the config file, if any, and apply the root override
pub fn load_config(path: Option<&Path>, root: Option<PathBuf>) -> CliResult<HostConfig> {
    let mut config = match path {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    config.validate()?;
    Ok(config)
}

/// Boot the host and serve until Ctrl-C
pub fn start(config: HostConfig) -> CliResult<()> {
    observability::init(config.log_json);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Io(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let loader = WasmLoader::new();
        let host = Host::start(config, &loader).await?;
        host.run().await?;
        Ok::<(), CliError>(())
    })
}

/// Write one JSON line per discovered function
pub fn list(config: &HostConfig, out: &mut impl Write) -> CliResult<()> {
    let root = resolve_root(&config.root, &install_dir()?);
    let registry = FunctionRegistry::discover(&root, &WasmLoader::new())?;

    for line in describe_all(&registry) {
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    Ok(())
}

fn describe_all(registry: &FunctionRegistry) -> Vec<Value> {
    registry.iter().map(|f| describe(f)).collect()
}

fn describe(function: &FunctionDefinition) -> Value {
    let triggers: Vec<&str> = TriggerKind::ALL
        .iter()
        .filter(|kind| function.configuration.binding(kind.as_str()).is_some())
        .map(|kind| kind.as_str())
        .collect();

    json!({
        "name": function.name,
        "path": function.path.display().to_string(),
        "disabled": function.is_disabled(),
        "triggers": triggers,
    })
}
