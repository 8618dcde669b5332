//! Content classification: file path → MIME type.

use std::path::Path;

/// Fallback for anything the tables below do not know.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Web-asset extensions with pinned MIME types. These take precedence over
/// `mime_guess` so the cache policy sees stable values (`.js` is always
/// `application/javascript`, never `text/javascript`).
const WEB_ASSET_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("cjs", "application/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    ("bmp", "image/bmp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("wasm", "application/wasm"),
    ("pdf", "application/pdf"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
];

/// Result of classifying a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentClassification {
    pub mime_type: String,
}

/// Classify `path` by its extension. Never fails.
pub fn classify(path: &Path) -> ContentClassification {
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| {
            WEB_ASSET_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| (*mime).to_string())
                .or_else(|| {
                    mime_guess::from_ext(&ext)
                        .first()
                        .map(|mime| mime.essence_str().to_string())
                })
        })
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    ContentClassification { mime_type }
}

/// MIME type without parameters, lowercased.
pub(crate) fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mime(path: &str) -> String {
        classify(Path::new(path)).mime_type
    }

    #[test]
    fn pinned_web_types() {
        assert_eq!(mime("assets/app.js"), "application/javascript");
        assert_eq!(mime("assets/app.MJS"), "application/javascript");
        assert_eq!(mime("assets/site.css"), "text/css");
        assert_eq!(mime("index.html"), "text/html");
        assert_eq!(mime("logo.svg"), "image/svg+xml");
        assert_eq!(mime("fonts/inter.woff2"), "font/woff2");
    }

    #[test]
    fn falls_back_to_mime_guess() {
        assert_eq!(mime("data/report.csv"), "text/csv");
    }

    #[test]
    fn unknown_and_missing_extensions_are_octet_stream() {
        assert_eq!(mime("blob.unknownext"), OCTET_STREAM);
        assert_eq!(mime("LICENSE"), OCTET_STREAM);
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("Text/HTML; charset=utf-8"), "text/html");
        assert_eq!(essence("application/json"), "application/json");
    }
}
