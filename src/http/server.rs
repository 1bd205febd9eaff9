//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create an Axum Router that hands every request to a processing context
//! - Wire up middleware (tracing, request ID, timeout)
//! - Start the context before serving and stop it after shutdown

use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HostConfig;
use crate::context::ProcessingContext;
use crate::error::ContextError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// HTTP server hosting one processing context.
pub struct HttpServer {
    router: Router,
    context: ProcessingContext,
    config: HostConfig,
}

impl HttpServer {
    pub fn new(config: HostConfig, context: ProcessingContext) -> Self {
        let router = Self::build_router(&config, context.clone());
        Self {
            router,
            context,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HostConfig, context: ProcessingContext) -> Router {
        Router::new()
            .fallback_service(context)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Start the context, serve until Ctrl+C, then stop the context.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;

        self.context.start()?;
        tracing::info!(
            address = %addr,
            context_path = %self.context.context_path(),
            "HTTP server starting"
        );

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        shutdown_outcome(served, self.context.stop())?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.context
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Combine the serve and stop results. A serve error takes precedence; a
/// stop error is always logged.
fn shutdown_outcome(
    served: std::io::Result<()>,
    stopped: Result<(), ContextError>,
) -> Result<(), ServerError> {
    if let Err(e) = &stopped {
        tracing::error!(error = %e, "Failed to stop context");
    }
    served?;
    stopped?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
