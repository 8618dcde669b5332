use crate::error::{AppError, ErrorRecord};
use crate::fallback::ResolvedResponse;
use crate::state::ServerState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{Response as HttpResponse, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::sync::Arc;
use tower::BoxError;

/// Headers put on every response unless a handler already set them.
pub fn global_security_headers() -> [(HeaderName, &'static str); 4] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    ]
}

/// Global security headers. Per-asset policy set further in wins.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in global_security_headers() {
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Request id as stored in the request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();
    let resolution = response
        .extensions()
        .get::<ResolvedResponse>()
        .map(ResolvedResponse::kind)
        .unwrap_or("route");

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        resolution,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}

/// Request host (port included), lowercased.
fn request_host(request: &Request) -> Option<String> {
    let raw = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string))?;
    Some(raw.to_ascii_lowercase())
}

/// `www.` hosts get a permanent redirect to the bare host. Production only.
pub async fn canonical_host(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.mode().is_production() {
        return next.run(request).await;
    }

    let Some(bare_host) = request_host(&request)
        .and_then(|host| host.strip_prefix("www.").map(str::to_string))
        .filter(|host| !host.is_empty())
    else {
        return next.run(request).await;
    };

    let scheme = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.config.canonical_scheme.clone());
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = format!("{scheme}://{bare_host}{path_and_query}");

    tracing::debug!(%location, "Redirecting to canonical host");
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => next.run(request).await,
    }
}

/// Terminal error boundary.
///
/// Logs every error response produced below it with message, source chain,
/// path and method. With `fail_fast_on_request_error` set, a server error
/// also fires the shutdown trigger once the response is on its way.
pub async fn error_boundary(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    let Some(record) = response.extensions().get::<ErrorRecord>().cloned() else {
        return response;
    };
    if response.extensions().get::<ResolvedResponse>().is_none() {
        response.extensions_mut().insert(ResolvedResponse::Error);
    }

    if record.status.is_server_error() {
        tracing::error!(
            message = %record.message,
            stack = ?record.stack,
            path = %path,
            method = %method,
            status = record.status.as_u16(),
            "Unhandled request error"
        );
        if state.config.fail_fast_on_request_error {
            tracing::error!("Fail-fast enabled, shutting down after request error");
            state.shutdown.trigger();
        }
    } else {
        tracing::warn!(
            message = %record.message,
            stack = ?record.stack,
            path = %path,
            method = %method,
            status = record.status.as_u16(),
            "Request error"
        );
    }

    response
}

/// Panic hook for `CatchPanicLayer`: same JSON shape as any other error.
/// The payload only reaches the log record, never the body.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> HttpResponse<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    let mut response = AppError::Panic.into_response();
    if let Some(record) = response.extensions_mut().get_mut::<ErrorRecord>() {
        record.stack.push(format!("handler panicked: {detail}"));
    }
    response
}

/// Error handler for the request timeout layer.
pub async fn timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(err.to_string())
    }
}
