//! # Function Host
//!
//! Startup sequence:
//! 1. Resolve the functions root and discover every function under it
//! 2. Classify enabled functions by trigger type
//! 3. Arm timer triggers (all schedules must parse)
//! 4. Open the HTTP listener, if any function is HTTP-triggered
//! 5. Fire manual triggers without waiting for them
//!
//! After that the host services timers and requests until shut down.

pub mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::functions::errors::FunctionError;
use crate::functions::module::ModuleLoader;
use crate::functions::registry::{install_dir, resolve_root, FunctionRegistry};
use crate::functions::scheduler::Scheduler;
use crate::functions::trigger::{Classified, TriggerKind};
use crate::http_server::{BoundHttpServer, HttpServer};
use crate::runners::{arm_timer_triggers, run_manual_triggers};

pub use config::{ConfigError, HostConfig};

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;

/// A started host
pub struct Host {
    root: PathBuf,
    registry: FunctionRegistry,
    classified: Classified,
    scheduler: Scheduler,
    http: Option<BoundHttpServer>,
    manual: Vec<JoinHandle<()>>,
}

impl Host {
    /// Discover functions and arm every trigger
    ///
    /// Must be called inside a tokio runtime. Manual triggers have been
    /// fired, but not necessarily finished, when this returns.
    pub async fn start(config: HostConfig, loader: &dyn ModuleLoader) -> HostResult<Self> {
        config.validate()?;

        let root = resolve_root(&config.root, &install_dir()?);
        let registry = FunctionRegistry::discover(&root, loader)?;
        let classified = Classified::from_registry(&registry);

        let scheduler = Scheduler::new();
        arm_timer_triggers(classified.bucket(TriggerKind::Timer), &scheduler)?;

        let http = match HttpServer::new(config.http.clone(), classified.bucket(TriggerKind::Http).to_vec()) {
            Some(server) => {
                let addr = server.socket_addr();
                let bound = server
                    .bind()
                    .await
                    .map_err(|source| HostError::Bind { addr, source })?;
                Some(bound)
            }
            None => None,
        };

        let manual = run_manual_triggers(classified.bucket(TriggerKind::Manual));

        tracing::info!(
            event = "HOST_STARTED",
            root = %root.display(),
            functions = registry.len(),
            manual = classified.bucket(TriggerKind::Manual).len(),
            timer = classified.bucket(TriggerKind::Timer).len(),
            http = classified.bucket(TriggerKind::Http).len(),
            "Function host started"
        );

        Ok(Self {
            root,
            registry,
            classified,
            scheduler,
            http,
            manual,
        })
    }

    /// Resolved functions root
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn classified(&self) -> &Classified {
        &self.classified
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Listener address, when an HTTP server was opened
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().map(BoundHttpServer::local_addr)
    }

    /// Reporting tasks of the manual triggers fired at startup
    pub fn take_manual_handles(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.manual)
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> HostResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(event = "HOST_SIGNAL_ERROR", error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves, then cancel scheduled jobs
    pub async fn run_until<F>(self, shutdown: F) -> HostResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Host { scheduler, http, .. } = self;

        match http {
            Some(server) => server.serve(shutdown).await.map_err(HostError::Serve)?,
            None => shutdown.await,
        }

        scheduler.shutdown();
        tracing::info!(event = "HOST_STOPPED", "Function host stopped");
        Ok(())
    }
}

/// Start a host on `root` and serve until Ctrl-C
///
/// `port` defaults to 80; an empty `keys` list only admits anonymous
/// HTTP functions.
pub async fn start(
    root: impl Into<PathBuf>,
    port: Option<u16>,
    keys: Vec<String>,
    loader: &dyn ModuleLoader,
) -> HostResult<()> {
    let mut config = HostConfig::new(root).with_keys(keys);
    if let Some(port) = port {
        config = config.with_port(port);
    }
    Host::start(config, loader).await?.run().await
}
