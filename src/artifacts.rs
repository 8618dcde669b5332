//! Startup gate guaranteeing the built bundle exists before any request is
//! served.
//!
//! [`verify_build_artifacts`] creates the output directory when absent,
//! runs the build once when the entry document is missing, and re-checks the
//! entry document afterward. It is synchronous and runs before the listener
//! is bound. The returned [`VerifiedArtifacts`] is the only way to obtain the
//! value the production router is built from.

use crate::error::StartupError;
use crate::mode::MODE_ENV_VAR;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// What the filesystem looked like before any repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildArtifactState {
    pub output_directory_exists: bool,
    pub entry_document_exists: bool,
}

impl BuildArtifactState {
    pub fn inspect(output_dir: &Path, entry_document: &str) -> Self {
        Self {
            output_directory_exists: output_dir.is_dir(),
            entry_document_exists: output_dir.join(entry_document).is_file(),
        }
    }
}

/// Proof that the entry document existed once startup finished.
#[derive(Debug, Clone)]
pub struct VerifiedArtifacts {
    output_root: PathBuf,
    entry_document: String,
    /// True when this startup had to run the build.
    pub built: bool,
}

impl VerifiedArtifacts {
    /// Canonical output root.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn entry_path(&self) -> PathBuf {
        self.output_root.join(&self.entry_document)
    }
}

/// Produces the built bundle. Invoked at most once per startup.
pub trait BuildRunner {
    fn run(&self) -> Result<(), StartupError>;
}

/// Runs an external build program with inherited stdio and the mode
/// variable forced to `production`.
#[derive(Debug, Clone)]
pub struct CommandBuildRunner {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandBuildRunner {
    /// `command[0]` is the program, the rest are arguments.
    pub fn from_command(command: &[String]) -> Result<Self, StartupError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| StartupError::InvalidConfig("empty build command".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl BuildRunner for CommandBuildRunner {
    fn run(&self) -> Result<(), StartupError> {
        info!(program = %self.program, args = ?self.args, "Running build");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(MODE_ENV_VAR, "production")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .map_err(|err| StartupError::BuildFailed(format!("{}: {err}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(StartupError::BuildFailed(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

/// Ensure `output_dir/entry_document` exists, building it if necessary.
pub fn verify_build_artifacts(
    output_dir: &Path,
    entry_document: &str,
    runner: &dyn BuildRunner,
) -> Result<VerifiedArtifacts, StartupError> {
    let state = BuildArtifactState::inspect(output_dir, entry_document);

    if !state.output_directory_exists {
        warn!(path = %output_dir.display(), "Output directory missing, creating it");
        std::fs::create_dir_all(output_dir).map_err(|source| StartupError::CreateOutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
    }

    let entry_path = output_dir.join(entry_document);
    let built = !state.entry_document_exists;
    if built {
        warn!(path = %entry_path.display(), "Entry document missing, building");
        runner.run()?;

        // A zero exit status does not prove the artifact was written.
        if !entry_path.is_file() {
            return Err(StartupError::EntryMissing(entry_path));
        }
    }

    let output_root =
        output_dir
            .canonicalize()
            .map_err(|source| StartupError::CreateOutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

    info!(root = %output_root.display(), built, "Build artifacts verified");
    Ok(VerifiedArtifacts {
        output_root,
        entry_document: entry_document.to_string(),
        built,
    })
}
