//! Shared fixtures for the HTTP integration suites.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use spa_serve::{
    BuildRunner, Pipeline, ServerConfig, ServerState, StartupError, build_app,
    verify_build_artifacts,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SHELL: &str = "<!doctype html><html><body><div id=\"root\"></div></body></html>";
pub const NOT_FOUND_PAGE: &str = "<!doctype html><html><body>Page not found</body></html>";

/// Build runner that must never be called.
pub struct NoBuild;

impl BuildRunner for NoBuild {
    fn run(&self) -> Result<(), StartupError> {
        panic!("build should not run when artifacts exist");
    }
}

/// Output root with a shell, a not-found page and a few assets.
pub struct Fixture {
    pub dir: TempDir,
    pub state: Arc<ServerState>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = dir.path();
        std::fs::write(root.join("index.html"), SHELL).unwrap();
        std::fs::write(root.join("404.html"), NOT_FOUND_PAGE).unwrap();
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("assets/app.js"), "console.log('app')").unwrap();
        std::fs::write(root.join("assets/app.css"), "body{margin:0}").unwrap();
        std::fs::write(root.join(".env"), "SECRET=1").unwrap();

        let config = ServerConfig {
            output_dir: root.to_path_buf(),
            ..config
        };
        let artifacts = verify_build_artifacts(root, &config.entry_document, &NoBuild)
            .expect("artifacts should verify");
        let state = Arc::new(ServerState::new(config, Pipeline::Production(artifacts)));

        Self { dir, state }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn app(&self, api: Router) -> Router {
        build_app(self.state.clone(), api)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
