//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the application routes with timeout and body-limit layers
//! - Install the logging middleware around everything
//! - Serve with graceful shutdown and apply config reloads

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::MiddlewareConfig;
use crate::http::middleware::MiddlewareState;

/// HTTP server for an application behind the logging middleware.
pub struct HttpServer {
    router: Router,
    config: MiddlewareConfig,
    state: MiddlewareState,
}

impl HttpServer {
    /// Create a server for `routes`.
    pub fn new(config: MiddlewareConfig, state: MiddlewareState, routes: Router) -> Self {
        let router = Self::build_router(&config, &state, routes);
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MiddlewareConfig, state: &MiddlewareState, routes: Router) -> Router {
        let routes = routes
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size));
        state.apply(routes)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    /// Run until `shutdown` resolves. Each config received on
    /// `config_updates` is applied to the request policy.
    pub async fn run<F>(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<MiddlewareConfig>>,
        shutdown: F,
    ) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(mut updates) = config_updates {
            let state = self.state.clone();
            tokio::spawn(async move {
                while let Some(config) = updates.recv().await {
                    state.reload(&config);
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.state.emitter().flush();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
