//! Development-mode collaborator.
//!
//! In development the built bundle is not served at all; every non-API
//! request is handed to a live dev server (Vite or similar) through a
//! [`DevServer`]. [`ProxyDevServer`] is the HTTP reverse-proxy
//! implementation.

use crate::error::AppResult;
use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

/// Something that can answer requests in development mode.
#[async_trait]
pub trait DevServer: Send + Sync {
    async fn forward(&self, request: Request) -> AppResult<Response>;
}

#[cfg(feature = "dev-proxy")]
pub use proxy::ProxyDevServer;

#[cfg(feature = "dev-proxy")]
mod proxy {
    use super::DevServer;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{HeaderMap, HeaderName, header};
    use axum::response::Response;
    use tracing::debug;

    /// Largest request body forwarded to the dev server.
    const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

    static HOP_BY_HOP: [HeaderName; 6] = [
        header::CONNECTION,
        header::HOST,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ];

    fn strip_hop_by_hop(headers: &mut HeaderMap) {
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        headers.remove("keep-alive");
    }

    /// Reverse proxy to the dev server at `base_url`.
    #[derive(Debug, Clone)]
    pub struct ProxyDevServer {
        client: reqwest::Client,
        base_url: String,
    }

    impl ProxyDevServer {
        /// The dev server is local, so system proxy settings are ignored.
        pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
            let client = reqwest::Client::builder().no_proxy().build()?;
            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            })
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        fn target_url(&self, request: &Request) -> String {
            let path_and_query = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            format!("{}{}", self.base_url, path_and_query)
        }
    }

    #[async_trait]
    impl DevServer for ProxyDevServer {
        async fn forward(&self, request: Request) -> AppResult<Response> {
            let url = self.target_url(&request);
            debug!(%url, method = %request.method(), "Proxying to dev server");

            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, MAX_FORWARD_BODY)
                .await
                .map_err(|err| AppError::DevServer(format!("reading request body: {err}")))?;

            let mut headers = parts.headers;
            strip_hop_by_hop(&mut headers);

            let upstream = self
                .client
                .request(parts.method, &url)
                .headers(headers)
                .body(body)
                .send()
                .await
                .map_err(|err| AppError::DevServer(format!("{url}: {err}")))?;

            let status = upstream.status();
            let mut response_headers = upstream.headers().clone();
            strip_hop_by_hop(&mut response_headers);
            let bytes = upstream
                .bytes()
                .await
                .map_err(|err| AppError::DevServer(format!("{url}: {err}")))?;

            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = response_headers;
            Ok(response)
        }
    }

}
