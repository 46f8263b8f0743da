// src/build/tool.rs

//! External build tool invocation.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::types::BoxFuture;

/// Exit status and captured output of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Seam for whatever actually compiles a project.
///
/// Returning `Err` means the tool could not be invoked at all; a build that
/// ran and failed is an `Ok` with a non-zero exit code.
pub trait BuildTool: Send + Sync {
    fn build<'a>(&'a self, project_dir: &'a Path) -> BoxFuture<'a, Result<BuildOutput>>;
}

/// Runs a shell command (e.g. `dotnet build --nologo`) in the project
/// directory.
#[derive(Debug, Clone)]
pub struct CommandBuildTool {
    command: String,
}

impl CommandBuildTool {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl BuildTool for CommandBuildTool {
    fn build<'a>(&'a self, project_dir: &'a Path) -> BoxFuture<'a, Result<BuildOutput>> {
        Box::pin(async move {
            info!(project = %project_dir.display(), cmd = %self.command, "starting build process");

            // Build a shell command appropriate for the platform.
            let mut cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&self.command);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&self.command);
                c
            };

            cmd.current_dir(project_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let output = cmd
                .output()
                .await
                .with_context(|| format!("running build command '{}'", self.command))?;

            let exit_code = output.status.code().unwrap_or(-1);
            debug!(
                project = %project_dir.display(),
                exit_code,
                "build process exited"
            );

            Ok(BuildOutput {
                exit_code,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
