//! spa-serve - production host for single-page web applications
//!
//! The crate decides how every request becomes bytes:
//!
//! - **Mode selection**: `NODE_ENV=development` proxies to a live dev
//!   server, anything else serves the built bundle
//! - **Build gate**: in production the output root and shell document are
//!   verified (and built once if missing) before the listener is bound
//! - **Static assets**: regular files under the output root, confined to it,
//!   with ETag/Last-Modified validators
//! - **SPA fallback**: unmatched non-API paths get the shell document, then
//!   the not-found document, then a JSON error
//! - **Policy**: per-MIME Cache-Control plus global and HTML-only security
//!   headers
//!
//! The application's own API is an ordinary [`axum::Router`] mounted under
//! the API prefix. It always wins over files and the shell.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use spa_serve::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     spa_serve::init_tracing(&config.log_level);
//!
//!     let api = Router::new().route("/health", get(|| async { "ok" }));
//!     spa_serve::start_server(config, api).await?;
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod assets;
pub mod cache_policy;
pub mod classify;
pub mod config;
pub mod dev;
pub mod error;
pub mod fallback;
pub mod middleware;
pub mod mode;
pub mod server;
pub mod state;

pub use artifacts::{BuildRunner, CommandBuildRunner, VerifiedArtifacts, verify_build_artifacts};
pub use cache_policy::CachePolicy;
pub use classify::{ContentClassification, classify};
pub use config::ServerConfig;
pub use error::{AppError, AppResult, StartupError};
pub use fallback::ResolvedResponse;
pub use mode::ServerMode;
pub use server::{ShutdownReason, build_app, build_pipeline, init_tracing, serve, start_server};
pub use state::{Pipeline, ServerState};
