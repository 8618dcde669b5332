//! Startup gate: mode selection, build verification and process exit codes.

use std::cell::Cell;
use std::path::Path;

use spa_serve::{
    BuildRunner, Pipeline, ServerConfig, ServerMode, StartupError, build_pipeline, start_server,
};

struct CountingBuild<'a> {
    calls: Cell<usize>,
    writes_entry: Option<&'a Path>,
}

impl<'a> CountingBuild<'a> {
    fn failing() -> Self {
        Self {
            calls: Cell::new(0),
            writes_entry: None,
        }
    }

    fn producing(entry: &'a Path) -> Self {
        Self {
            calls: Cell::new(0),
            writes_entry: Some(entry),
        }
    }
}

impl BuildRunner for CountingBuild<'_> {
    fn run(&self) -> Result<(), StartupError> {
        self.calls.set(self.calls.get() + 1);
        match self.writes_entry {
            Some(path) => std::fs::write(path, "<html></html>")
                .map_err(|e| StartupError::BuildFailed(e.to_string())),
            None => Err(StartupError::BuildFailed("exit status: 1".to_string())),
        }
    }
}

fn production_config(output_dir: &Path) -> ServerConfig {
    ServerConfig {
        mode: ServerMode::Production,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn missing_bundle_is_built_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("dist/public");
    let entry = out.join("index.html");
    let runner = CountingBuild::producing(&entry);

    let pipeline = build_pipeline(&production_config(&out), &runner).unwrap();

    assert_eq!(runner.calls.get(), 1);
    match pipeline {
        Pipeline::Production(artifacts) => {
            assert!(artifacts.built);
            assert!(artifacts.entry_path().is_file());
        }
        Pipeline::Development(_) => panic!("expected production pipeline"),
    }
}

#[test]
fn failing_build_stops_startup() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("dist/public");
    let runner = CountingBuild::failing();

    let result = build_pipeline(&production_config(&out), &runner);

    assert!(matches!(result, Err(StartupError::BuildFailed(_))));
    assert_eq!(runner.calls.get(), 1);
    assert!(out.is_dir(), "output directory is created before building");
}

#[test]
fn development_mode_skips_the_build_gate() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never-created");
    let runner = CountingBuild::failing();
    let config = ServerConfig {
        mode: ServerMode::Development,
        ..production_config(&out)
    };

    let pipeline = build_pipeline(&config, &runner).unwrap();

    assert_eq!(pipeline.mode(), ServerMode::Development);
    assert_eq!(runner.calls.get(), 0);
    assert!(!out.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn start_server_returns_before_binding_when_build_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        build_command: vec!["false".to_string()],
        port: 0,
        bind_addr: "127.0.0.1".to_string(),
        ..production_config(&dir.path().join("dist"))
    };

    let result = start_server(config, axum::Router::new()).await;

    assert!(matches!(result, Err(StartupError::BuildFailed(_))));
}

#[cfg(unix)]
#[test]
fn binary_exits_with_code_one_after_a_failed_build() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("build-count");
    let script = dir.path().join("build.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho run >> '{}'\nexit 3\n", counter.display()),
    )
    .unwrap();

    let status = std::process::Command::new(env!("CARGO_BIN_EXE_spa-serve"))
        .current_dir(dir.path())
        .env("NODE_ENV", "production")
        .env("PORT", "0")
        .env("SPA_SERVE__OUTPUT_DIR", dir.path().join("dist/public"))
        .env(
            "SPA_SERVE__BUILD_COMMAND",
            format!("sh {}", script.display()),
        )
        .env("RUST_LOG", "off")
        .status()
        .expect("binary should start");

    assert_eq!(status.code(), Some(1));
    let runs = std::fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 1);
}

#[cfg(unix)]
#[test]
fn binary_rejects_a_non_numeric_port() {
    let dir = tempfile::tempdir().unwrap();

    let status = std::process::Command::new(env!("CARGO_BIN_EXE_spa-serve"))
        .current_dir(dir.path())
        .env("PORT", "not-a-port")
        .env("RUST_LOG", "off")
        .status()
        .expect("binary should start");

    assert_eq!(status.code(), Some(1));
}
