//! Static asset resolution and file responses.

use crate::cache_policy::CachePolicy;
use crate::classify::classify;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// Percent-decode `path` and collapse empty and `.` segments, so `//api/x`,
/// `/./api/x` and `/%61pi/x` all read as `/api/x`. `None` when the decoded
/// bytes are not UTF-8.
pub fn normalize_request_path(path: &str) -> Option<String> {
    let decoded = urlencoding::decode(path).ok()?;
    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    Some(format!("/{}", segments.join("/")))
}

/// Map a request path onto a regular file under `root`.
///
/// `root` must already be canonical. Parent references, dotfile segments and
/// anything resolving outside `root` (symlinks included) yield `None`, as do
/// directories.
pub async fn resolve_asset(root: &Path, request_path: &str) -> Option<PathBuf> {
    let normalized = normalize_request_path(request_path)?;
    let relative = normalized.trim_start_matches('/');

    let mut candidate = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                let name_str = name.to_str()?;
                if name_str.starts_with('.') || name_str.contains('\0') {
                    return None;
                }
                candidate.push(name);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if depth == 0 {
        return None;
    }

    let resolved = fs::canonicalize(&candidate).await.ok()?;
    if !resolved.starts_with(root) {
        debug!(path = %request_path, "Asset resolved outside output root");
        return None;
    }

    let metadata = fs::metadata(&resolved).await.ok()?;
    metadata.is_file().then_some(resolved)
}

/// Weak validator from size and modification time, to the nanosecond so a
/// same-size rebuild within one second still changes it.
fn etag_for(len: u64, modified: SystemTime) -> String {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("W/\"{len:x}-{nanos:x}\"")
}

fn not_modified(headers: &HeaderMap, etag: &str, modified: SystemTime) -> bool {
    if let Some(if_none_match) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        let bare = etag.trim_start_matches("W/").trim_matches('"');
        return if_none_match.trim() == "*"
            || if_none_match
                .split(',')
                .any(|tag| tag.trim().trim_start_matches("W/").trim_matches('"') == bare);
    }

    if let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    {
        // HTTP dates have second precision.
        let modified_secs = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let since_secs = since.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        return modified_secs <= since_secs;
    }

    false
}

/// Send `path` with its content type, cache policy and validators.
///
/// Conditional requests are honoured only for `200` responses.
pub async fn serve_file(
    path: &Path,
    status: StatusCode,
    method: &Method,
    request_headers: &HeaderMap,
) -> std::io::Result<Response> {
    let metadata = fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a regular file", path.display()),
        ));
    }
    let modified = metadata.modified()?;
    let len = metadata.len();
    let etag = etag_for(len, modified);

    let classification = classify(path);
    let policy = CachePolicy::for_mime(&classification.mime_type);

    let mut headers = HeaderMap::new();
    policy.apply(&mut headers);
    headers.insert(
        header::ETAG,
        HeaderValue::from_str(&etag).map_err(std::io::Error::other)?,
    );
    headers.insert(
        header::LAST_MODIFIED,
        HeaderValue::from_str(&httpdate::fmt_http_date(modified)).map_err(std::io::Error::other)?,
    );

    if status == StatusCode::OK && not_modified(request_headers, &etag, modified) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        *response.headers_mut() = headers;
        return Ok(response);
    }

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&classification.mime_type).map_err(std::io::Error::other)?,
    );

    let body = if method == Method::HEAD {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        Body::empty()
    } else {
        let bytes = fs::read(path).await?;
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        Body::from(bytes)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
