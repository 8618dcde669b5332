//! Cache-Control and per-asset security headers keyed by MIME type.

use crate::classify::essence;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=2592000";
pub const SCRIPT_STYLE_CACHE_CONTROL: &str = "public, max-age=604800";
pub const HTML_CACHE_CONTROL: &str = "no-cache, must-revalidate";
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=86400";

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
style-src 'self' 'unsafe-inline'; \
img-src 'self' data: https:; \
font-src 'self' data:; \
connect-src 'self' https:";

/// Headers attached to a static response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache_control: &'static str,
    pub extra_security_headers: Vec<(HeaderName, &'static str)>,
}

impl CachePolicy {
    /// Pure lookup; parameters such as `charset` are ignored.
    pub fn for_mime(mime: &str) -> Self {
        let mime = essence(mime);
        let mut extra_security_headers = vec![(header::X_CONTENT_TYPE_OPTIONS, "nosniff")];

        let cache_control = match mime.as_str() {
            m if m.starts_with("image/") => IMAGE_CACHE_CONTROL,
            "application/javascript" | "text/javascript" | "text/css" => {
                SCRIPT_STYLE_CACHE_CONTROL
            }
            "text/html" => {
                extra_security_headers.extend([
                    (header::X_FRAME_OPTIONS, "DENY"),
                    (header::X_XSS_PROTECTION, "1; mode=block"),
                    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
                ]);
                HTML_CACHE_CONTROL
            }
            _ => DEFAULT_CACHE_CONTROL,
        };

        Self {
            cache_control,
            extra_security_headers,
        }
    }

    /// Write the policy onto `headers`, replacing any global defaults.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(self.cache_control),
        );
        for (name, value) in &self.extra_security_headers {
            headers.insert(name.clone(), HeaderValue::from_static(*value));
        }
    }
}
