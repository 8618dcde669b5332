//! Router assembly and process lifecycle.
//!
//! This module handles:
//! - Mode selection and the production startup gate
//! - Router configuration: API collaborator, SPA fallback, middleware stack
//! - Graceful shutdown, including fail-fast shutdown after request errors

use crate::artifacts::{BuildRunner, CommandBuildRunner, verify_build_artifacts};
use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::fallback::spa_fallback;
use crate::middleware::{
    canonical_host, error_boundary, log_requests, panic_response, request_id, security_headers,
    timeout_error,
};
use crate::mode::ServerMode;
use crate::state::{Pipeline, ServerState, ShutdownTrigger};
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::middleware::{from_fn, from_fn_with_state};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C or SIGTERM.
    Signal,
    /// The error boundary asked for shutdown.
    RequestError,
}

/// Pick the request pipeline for the configured mode.
///
/// Production runs the build artifact gate with `runner`; development wires
/// the dev-server proxy. Runs once, before anything is bound.
pub fn build_pipeline(
    config: &ServerConfig,
    runner: &dyn BuildRunner,
) -> Result<Pipeline, StartupError> {
    match config.mode {
        ServerMode::Production => {
            let artifacts =
                verify_build_artifacts(&config.output_dir, &config.entry_document, runner)?;
            Ok(Pipeline::Production(artifacts))
        }
        ServerMode::Development => dev_pipeline(config),
    }
}

#[cfg(feature = "dev-proxy")]
fn dev_pipeline(config: &ServerConfig) -> Result<Pipeline, StartupError> {
    let proxy = crate::dev::ProxyDevServer::new(config.dev_server_url.clone())
        .map_err(|err| StartupError::InvalidConfig(format!("dev server client: {err}")))?;
    tracing::info!(upstream = %proxy.base_url(), "Development mode, proxying to dev server");
    Ok(Pipeline::Development(Arc::new(proxy)))
}

#[cfg(not(feature = "dev-proxy"))]
fn dev_pipeline(_config: &ServerConfig) -> Result<Pipeline, StartupError> {
    Err(StartupError::InvalidConfig(
        "development mode requires the `dev-proxy` feature".to_string(),
    ))
}

/// Build the full application router.
///
/// `api` is the application's own API router; it is mounted under the
/// configured prefix and always takes precedence over static files and the
/// shell. Middleware, outermost first:
/// 1. Tracing and request id
/// 2. Request logging
/// 3. Global security headers
/// 4. Host canonicalization (production)
/// 5. Error boundary
/// 6. Panic conversion
/// 7. Timeout
pub fn build_app(state: Arc<ServerState>, api: Router) -> Router {
    let prefix = state.config.normalized_api_prefix().to_string();

    let spa = Router::new()
        .fallback(spa_fallback)
        .with_state(state.clone());

    spa.nest(&prefix, api)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(timeout_error))
                .layer(TimeoutLayer::new(state.config.timeout())),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.clone(), error_boundary))
        .layer(from_fn_with_state(state.clone(), canonical_host))
        .layer(from_fn(security_headers))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
}

/// Initialise JSON logging. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // A second call (tests, embedding programs) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .try_init();
}

/// Start the server and run until shutdown.
///
/// Startup steps:
/// 1. Select the pipeline for the mode (production blocks on the build gate)
/// 2. Build the router around the supplied API router
/// 3. Bind `bind_addr:port`
/// 4. Serve with graceful shutdown on signals or the fail-fast trigger
///
/// Any error before step 4 means no request was ever accepted.
pub async fn start_server(
    config: ServerConfig,
    api: Router,
) -> Result<ShutdownReason, StartupError> {
    let runner = CommandBuildRunner::from_command(&config.build_command)?;
    let pipeline = build_pipeline(&config, &runner)?;
    serve(config, pipeline, api).await
}

/// Bind and serve an already verified pipeline.
pub async fn serve(
    config: ServerConfig,
    pipeline: Pipeline,
    api: Router,
) -> Result<ShutdownReason, StartupError> {
    let addr = config.socket_addr()?;
    let state = Arc::new(ServerState::new(config, pipeline));
    let shutdown = state.shutdown.clone();
    let mode = state.mode();
    let app = build_app(state.clone(), api);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(
        %addr,
        mode = %mode,
        output_dir = %state.config.output_dir.display(),
        api_prefix = %state.config.normalized_api_prefix(),
        "Serving on {addr} in {mode} mode"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .map_err(StartupError::Serve)?;

    let reason = if shutdown.is_triggered() {
        ShutdownReason::RequestError
    } else {
        ShutdownReason::Signal
    };
    tracing::info!(?reason, "Server shutdown complete");
    Ok(reason)
}

/// Shutdown signal handler
async fn shutdown_signal(trigger: ShutdownTrigger) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        _ = trigger.triggered() => tracing::warn!("Request error with fail-fast enabled, shutting down..."),
    }
}
