//! # HTTP Server
//!
//! Listener for HTTP-triggered functions. Only built when at least one
//! HTTP trigger exists.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::config::HttpServerConfig;
use super::functions_routes::{functions_routes, FunctionsState, RouteTable};
use crate::functions::trigger::TriggerBinding;

/// HTTP server for function triggers
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server for `triggers`; `None` when there are none
    pub fn new(config: HttpServerConfig, triggers: Vec<TriggerBinding>) -> Option<Self> {
        if triggers.is_empty() {
            return None;
        }
        let state = FunctionsState::new(RouteTable::new(triggers), config.keys.clone());
        let router = functions_routes(Arc::new(state));
        Some(Self { config, router })
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Open the listener
    pub async fn bind(self) -> Result<BoundHttpServer, std::io::Error> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            event = "HTTP_SERVER_LISTENING",
            addr = %local_addr,
            "Server listening on: http://localhost:{}",
            local_addr.port()
        );

        Ok(BoundHttpServer {
            listener,
            local_addr,
            router: self.router,
        })
    }
}

/// HTTP server with an open listener
pub struct BoundHttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
}

impl BoundHttpServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::function::{Binding, FunctionConfiguration, FunctionDefinition};
    use crate::functions::module::NativeModule;

    fn http_trigger(name: &str) -> TriggerBinding {
        let binding = Binding::new("httpTrigger").with_auth_level("anonymous");
        let function = FunctionDefinition::new(
            name,
            format!("/fns/{}", name),
            Arc::new(NativeModule::http(|ctx, _| ctx.done(None, None))),
            FunctionConfiguration::with_bindings(vec![binding.clone()]),
        );
        TriggerBinding::new(Arc::new(function), binding)
    }

    #[test]
    fn test_no_triggers_no_server() {
        assert!(HttpServer::new(HttpServerConfig::default(), Vec::new()).is_none());
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::new(HttpServerConfig::listen("0.0.0.0", 8080), vec![http_trigger("hello")]).unwrap();
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = HttpServerConfig::listen("127.0.0.1", 0);

        let bound = HttpServer::new(config, vec![http_trigger("hello")])
            .unwrap()
            .bind()
            .await
            .unwrap();
        assert_ne!(bound.local_addr().port(), 0);
    }
}
