//! spa-serve binary.
//!
//! Serves the built single-page app with no API routes of its own. Returning
//! an error from `main` exits with code 1: any startup failure, or a
//! fail-fast shutdown after a request error.

use axum::Router;
use spa_serve::{ServerConfig, ShutdownReason};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = ServerConfig::load()?;
    spa_serve::init_tracing(&config.log_level);

    // Start server
    match spa_serve::start_server(config, Router::new()).await {
        Ok(ShutdownReason::Signal) => Ok(()),
        Ok(ShutdownReason::RequestError) => {
            anyhow::bail!("stopped after an unhandled request error")
        }
        Err(err) => {
            tracing::error!(error = %err, "Startup failed");
            Err(err.into())
        }
    }
}
