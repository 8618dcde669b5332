use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type AppResult<T> = Result<T, AppError>;

/// Unrecoverable failures before the listener is bound. The binary exits
/// with code 1 on any of these.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build command failed: {0}")]
    BuildFailed(String),

    #[error("entry document {0} is missing after build")]
    EntryMissing(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Request-scoped errors. Always converted into a JSON response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("application shell and not-found document are both unavailable")]
    ShellUnavailable {
        #[source]
        source: std::io::Error,
    },

    #[error("method {0} not allowed")]
    MethodNotAllowed(axum::http::Method),

    #[error("Not found")]
    NotFound,

    #[error("dev server unavailable: {0}")]
    DevServer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("Internal server error")]
    Panic,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Client-visible error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Log-only details of an error, carried on the response extensions so the
/// error boundary can record them after the handler returns.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub message: String,
    pub stack: Vec<String>,
    pub status: StatusCode,
}

impl AppError {
    /// Declared status for this error; anything undeclared is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DevServer(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::ShellUnavailable { .. }
            | AppError::Io(_)
            | AppError::Panic
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message plus the chain of underlying causes.
    pub fn record(&self) -> ErrorRecord {
        let mut stack = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            stack.push(err.to_string());
            source = err.source();
        }

        ErrorRecord {
            message: self.to_string(),
            stack,
            status: self.status_code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let record = self.record();
        let body = Json(ErrorBody {
            message: record.message.clone(),
        });

        let mut response = (record.status, body).into_response();
        response.extensions_mut().insert(record);
        response
    }
}
