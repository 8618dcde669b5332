//! SPA fallback routing.
//!
//! Every non-API request that no explicit route claimed ends up here. The
//! decision is an explicit priority list rather than middleware ordering:
//!
//! 1. API prefix: never handled here, passed on untouched.
//! 2. Regular file under the output root: served as a static asset.
//! 3. Anything else: the application shell, then the not-found document,
//!    then a hard error for the error boundary.

use crate::artifacts::VerifiedArtifacts;
use crate::assets::{normalize_request_path, resolve_asset, serve_file};
use crate::dev::DevServer;
use crate::error::{AppError, AppResult};
use crate::state::{Pipeline, ServerState};
use axum::extract::{OriginalUri, Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// First split of the priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Belongs to the API router.
    Api,
    /// May be a static asset or a client-side route.
    Candidate,
}

/// `prefix` is matched on whole segments: `/api` claims `/api` and
/// `/api/users` but not `/apiary`. The path is compared in the same
/// normalized form the asset resolver reads, so encoded or doubled slashes
/// cannot reach files under the prefix.
pub fn classify_route(path: &str, prefix: &str) -> RouteClass {
    let prefix = prefix.trim_end_matches('/');
    let normalized = normalize_request_path(path).unwrap_or_else(|| path.to_string());
    match normalized.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => RouteClass::Api,
        _ => RouteClass::Candidate,
    }
}

/// Outcome chosen for a request; exactly one per request. Attached to the
/// response extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResponse {
    StaticFile(PathBuf),
    ApplicationShell,
    NotFoundDocument,
    PassToNextHandler,
    Error,
}

impl ResolvedResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedResponse::StaticFile(_) => "static_file",
            ResolvedResponse::ApplicationShell => "application_shell",
            ResolvedResponse::NotFoundDocument => "not_found_document",
            ResolvedResponse::PassToNextHandler => "pass_to_next_handler",
            ResolvedResponse::Error => "error",
        }
    }
}

/// Decide between pass-through, static file and shell. Does not send
/// anything.
pub async fn resolve(
    artifacts: &VerifiedArtifacts,
    api_prefix: &str,
    path: &str,
) -> ResolvedResponse {
    if classify_route(path, api_prefix) == RouteClass::Api {
        return ResolvedResponse::PassToNextHandler;
    }
    match resolve_asset(artifacts.output_root(), path).await {
        Some(file) => ResolvedResponse::StaticFile(file),
        None => ResolvedResponse::ApplicationShell,
    }
}

fn tagged(mut response: Response, resolved: ResolvedResponse) -> Response {
    response.extensions_mut().insert(resolved);
    response
}

/// Send the shell, downgrading to the not-found document and then to an
/// error.
async fn send_shell(
    artifacts: &VerifiedArtifacts,
    not_found_document: &str,
    method: &Method,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let shell_err = match serve_file(&artifacts.entry_path(), StatusCode::OK, method, headers).await
    {
        Ok(response) => return Ok(tagged(response, ResolvedResponse::ApplicationShell)),
        Err(err) => err,
    };
    warn!(error = %shell_err, "Application shell could not be sent, trying not-found document");

    let not_found_path = artifacts.output_root().join(not_found_document);
    match serve_file(&not_found_path, StatusCode::NOT_FOUND, method, headers).await {
        Ok(response) => Ok(tagged(response, ResolvedResponse::NotFoundDocument)),
        Err(source) => Err(AppError::ShellUnavailable { source }),
    }
}

/// Handler for everything the explicit routes did not match.
pub async fn spa_fallback(
    State(state): State<Arc<ServerState>>,
    OriginalUri(uri): OriginalUri,
    request: Request,
) -> AppResult<Response> {
    let path = uri.path();
    let artifacts = match &state.pipeline {
        Pipeline::Production(artifacts) => artifacts,
        Pipeline::Development(dev) => return dev_fallback(&state, path, dev.as_ref(), request).await,
    };

    let resolved = resolve(artifacts, &state.config.api_prefix, path).await;
    debug!(path, resolution = resolved.kind(), "Resolved request");

    if resolved == ResolvedResponse::PassToNextHandler {
        // No API route matched; the API collaborator's miss is a plain 404.
        return Ok(pass_through());
    }

    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return Err(AppError::MethodNotAllowed(method));
    }
    let headers = request.headers();

    match resolved {
        ResolvedResponse::StaticFile(file) => {
            let response = serve_file(&file, StatusCode::OK, &method, headers).await?;
            Ok(tagged(response, ResolvedResponse::StaticFile(file)))
        }
        _ => send_shell(artifacts, &state.config.not_found_document, &method, headers).await,
    }
}

fn pass_through() -> Response {
    tagged(
        AppError::NotFound.into_response(),
        ResolvedResponse::PassToNextHandler,
    )
}

async fn dev_fallback(
    state: &ServerState,
    path: &str,
    dev: &dyn DevServer,
    request: Request,
) -> AppResult<Response> {
    if classify_route(path, &state.config.api_prefix) == RouteClass::Api {
        return Ok(pass_through());
    }
    dev.forward(request).await
}
