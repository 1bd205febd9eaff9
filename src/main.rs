//! Context host binary.
//!
//! Loads the host configuration, builds a processing context with a few demo
//! artifacts and serves it until Ctrl+C.

use std::path::PathBuf;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use clap::Parser;
use futures_util::future::BoxFuture;
use tokio::net::TcpListener;

use context_handler::artifact::InitParameters;
use context_handler::config::{load_config, HostConfig};
use context_handler::context::ContextFacade;
use context_handler::error::BoxError;
use context_handler::observability::{logging, metrics};
use context_handler::routing::{DispatcherTypes, Next};
use context_handler::session::Session;
use context_handler::{
    ContextListener, HttpServer, ListenerSource, Middleware, MiddlewareSource, ProcessingContext,
    Route, RouteSource,
};

#[derive(Parser)]
#[command(name = "context-handler")]
#[command(about = "Serve a processing context over HTTP", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Default)]
struct Hello {
    greeting: std::sync::OnceLock<String>,
}

impl Route for Hello {
    fn init(&self, params: &InitParameters) -> Result<(), BoxError> {
        let greeting = params.get("greeting").cloned().unwrap_or_else(|| "hello".into());
        let _ = self.greeting.set(greeting);
        Ok(())
    }

    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let greeting = self.greeting.get().cloned().unwrap_or_default();
        let session = request.extensions().get::<Session>().map(|s| s.id.clone());
        Box::pin(async move {
            match session {
                Some(id) => format!("{greeting} (session {id})\n").into_response(),
                None => format!("{greeting}\n").into_response(),
            }
        })
    }
}

#[derive(Default)]
struct AccessLog;

impl Middleware for AccessLog {
    fn call(&self, request: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        Box::pin(async move {
            let response = next.run(request).await;
            tracing::info!(method = %method, path = %path, status = %response.status(), "Access");
            response
        })
    }
}

#[derive(Default)]
struct Status;

impl Route for Status {
    fn handle(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(async { "running\n".into_response() })
    }
}

/// Registers the status route while the context starts.
#[derive(Default)]
struct StatusInstaller;

impl ContextListener for StatusInstaller {
    fn context_initialized(&self, context: &ContextFacade) -> Result<(), BoxError> {
        let status = context.add_route("status", RouteSource::of::<Status>())?;
        status.add_mapping(&["/status"])?;
        tracing::info!(version = %context.effective_version(), "Status route installed");
        Ok(())
    }
}

fn build_context(config: &HostConfig) -> Result<ProcessingContext, BoxError> {
    let context = ProcessingContext::from_settings(&config.context)?;

    let hello = context.add_route("hello", RouteSource::of::<Hello>(), "/")?;
    hello.set_init_parameter("greeting", "hello from the context")?;
    context.add_middleware("access-log", MiddlewareSource::of::<AccessLog>(), "/*", DispatcherTypes::REQUEST)?;
    context.add_listener(ListenerSource::of::<StatusInstaller>())?;
    Ok(context)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };

    logging::init(&config.observability.log_level)?;
    tracing::info!("context-handler v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        context_path = %config.context.context_path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = build_context(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(config, context).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
