use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, error, info, trace};
use mdviewer_platform::HideWindow;
use tokio::process::Command;

use crate::error::FailureReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the version-control client inside the installation root with a hard
/// timeout. Arguments are passed directly, never through a shell.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: PathBuf,
    working_dir: PathBuf,
    timeout: Duration,
}

impl GitRunner {
    pub fn new(
        program: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn program_name(&self) -> String {
        self.program.file_name().map_or_else(
            || self.program.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    fn build_command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .hide_window();
        cmd
    }

    /// Run one command to completion.
    ///
    /// # Errors
    /// Returns [`FailureReason::Timeout`] when the command outlives the
    /// configured timeout (the child is killed), [`FailureReason::CommandFailed`]
    /// for a non-zero exit and a spawn error when the program cannot be started.
    pub async fn run(&self, args: &[&str]) -> Result<CommandOutput, FailureReason> {
        let program = self.program_name();
        let display = format!("{program} {}", args.join(" "));
        info!("Executing command: {display}");

        let mut cmd = self.build_command(args);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(spawn_error)) if spawn_error.kind() == std::io::ErrorKind::NotFound => {
                error!("Command not found: {}", self.program.display());
                return Err(FailureReason::ProgramNotFound { program });
            }
            Ok(Err(spawn_error)) => {
                error!("Failed to run {display}: {spawn_error}");
                return Err(FailureReason::Spawn {
                    program,
                    message: spawn_error.to_string(),
                });
            }
            Err(_) => {
                error!(
                    "Command timed out after {}s: {display}",
                    self.timeout.as_secs()
                );
                return Err(FailureReason::timeout(display, self.timeout.as_secs()));
            }
        };

        debug!("Command exit status: {:?}", output.status);
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        trace!("stdout: {stdout}");
        if !stderr.is_empty() {
            trace!("stderr: {stderr}");
        }

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            error!("Command failed: {display}, stderr='{stderr}'");
            Err(FailureReason::CommandFailed {
                exit_code: output.status.code(),
                stderr,
            })
        }
    }
}
