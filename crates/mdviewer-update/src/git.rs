use async_trait::async_trait;
use log::{info, warn};

use crate::channel::{ProgressReporter, UpdateChannel};
use crate::command::{CommandOutput, GitRunner};
use crate::config::{UpdateConfig, VCS_DIR_NAME};
use crate::error::{FailureReason, PhaseFailure, UpdatePhase};
use crate::outcome::{ChannelDetails, ChannelKind, CommandRecord, UpdateOutcome};
use crate::version::{Version, VersionMarker};

/// Clean/dirty state of the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub is_clean: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Empty when the remote URL could not be read.
    pub url: String,
    pub branch: String,
}

/// Updates a checkout by fetching and force-resetting to the remote branch
/// tip. Local modifications to tracked files are discarded.
#[derive(Debug, Clone)]
pub struct RepositoryChannel {
    runner: GitRunner,
    marker: VersionMarker,
    remote: String,
    branch: String,
}

impl RepositoryChannel {
    #[must_use]
    pub fn new(config: &UpdateConfig) -> Self {
        Self {
            runner: GitRunner::new(
                &config.git_program,
                &config.install_root,
                config.command_timeout,
            ),
            marker: config.marker.clone(),
            remote: config.remote.clone(),
            branch: config.branch.clone(),
        }
    }

    #[must_use]
    pub fn is_repository(&self) -> bool {
        self.runner.working_dir().join(VCS_DIR_NAME).exists()
    }

    fn reset_target(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    async fn run_recorded(
        &self,
        args: &[&str],
        transcript: &mut Vec<CommandRecord>,
    ) -> Result<CommandOutput, FailureReason> {
        let result = self.runner.run(args).await;
        let (stdout, stderr) = match &result {
            Ok(output) => (output.stdout.clone(), output.stderr.clone()),
            Err(reason) => (String::new(), reason.diagnostic()),
        };
        transcript.push(CommandRecord {
            args: args.iter().map(ToString::to_string).collect(),
            stdout,
            stderr,
        });
        result
    }

    /// Fetch then hard-reset. Consumes no target version: the result is
    /// whatever the remote branch tip holds.
    pub async fn force_update(&self, progress: &ProgressReporter) -> UpdateOutcome {
        let current_version = self.current_version();
        let mut transcript = Vec::new();
        let mut diagnostic = String::new();

        if !self.is_repository() {
            let mut outcome = UpdateOutcome::new(
                ChannelDetails::Repository { transcript },
                current_version,
            );
            let reason = FailureReason::precondition(format!(
                "no {VCS_DIR_NAME} found in {}",
                self.runner.working_dir().display()
            ));
            outcome.fail(
                PhaseFailure::new(UpdatePhase::Fetching, reason)
                    .with_prefix("Installation directory is not a git checkout"),
            );
            return outcome;
        }

        progress.phase(UpdatePhase::Fetching).await;
        let fetch = self
            .run_recorded(&["fetch", &self.remote], &mut transcript)
            .await;
        let fetch_stdout = match fetch {
            Ok(output) => output.stdout,
            Err(reason) => {
                let mut outcome = UpdateOutcome::new(
                    ChannelDetails::Repository { transcript },
                    current_version,
                );
                outcome.fail(PhaseFailure::new(UpdatePhase::Fetching, reason));
                return outcome;
            }
        };
        diagnostic.push_str(&format!("Fetch: {fetch_stdout}\n"));

        progress.phase(UpdatePhase::Resetting).await;
        let target = self.reset_target();
        let reset = self
            .run_recorded(&["reset", "--hard", &target], &mut transcript)
            .await;
        let reset_stdout = match reset {
            Ok(output) => output.stdout,
            Err(reason) => {
                let mut outcome = UpdateOutcome::new(
                    ChannelDetails::Repository { transcript },
                    current_version,
                );
                outcome.diagnostic_output = diagnostic;
                outcome.fail(
                    PhaseFailure::new(UpdatePhase::Resetting, reason)
                        .with_prefix(format!("Failed to reset to {target}")),
                );
                return outcome;
            }
        };
        diagnostic.push_str(&format!("Reset: {reset_stdout}\n"));

        // Only trust the marker on disk after the reset has completed.
        let new_version = self.current_version();
        let shown = |version: &Option<Version>| {
            version
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string)
        };
        diagnostic.push_str(&format!(
            "Update completed: {} → {}",
            shown(&current_version),
            shown(&new_version)
        ));
        info!(
            "Repository update complete: {} -> {}",
            shown(&current_version),
            shown(&new_version)
        );

        let mut outcome =
            UpdateOutcome::new(ChannelDetails::Repository { transcript }, current_version);
        outcome.success = true;
        outcome.message = format!("Successfully updated to {}", shown(&new_version));
        outcome.new_version = new_version;
        outcome.diagnostic_output = diagnostic;
        outcome
    }

    /// Never fails: a status query error is reported as a dirty tree with
    /// the error text as message.
    pub async fn repository_status(&self) -> RepositoryStatus {
        match self.runner.run(&["status", "--porcelain"]).await {
            Ok(output) if output.stdout.is_empty() => RepositoryStatus {
                is_clean: true,
                message: "Working directory clean".to_string(),
            },
            Ok(_) => RepositoryStatus {
                is_clean: false,
                message: "Working directory has uncommitted changes".to_string(),
            },
            Err(reason) => {
                warn!("Failed to get repository status: {reason}");
                RepositoryStatus {
                    is_clean: false,
                    message: format!("Failed to get status: {reason}"),
                }
            }
        }
    }

    /// Remote URL and current branch. Missing values degrade to an empty URL
    /// and the configured branch.
    pub async fn remote_info(&self) -> RemoteInfo {
        let url_key = format!("remote.{}.url", self.remote);
        let url = match self.runner.run(&["config", "--get", &url_key]).await {
            Ok(output) => output.stdout,
            Err(reason) => {
                warn!("Failed to read remote URL: {reason}");
                return RemoteInfo {
                    url: String::new(),
                    branch: self.branch.clone(),
                };
            }
        };

        let branch = match self.runner.run(&["branch", "--show-current"]).await {
            Ok(output) if !output.stdout.is_empty() => output.stdout,
            Ok(_) => self.branch.clone(),
            Err(reason) => {
                warn!("Failed to read current branch: {reason}");
                self.branch.clone()
            }
        };

        RemoteInfo { url, branch }
    }
}

#[async_trait]
impl UpdateChannel for RepositoryChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Repository
    }

    fn current_version(&self) -> Option<Version> {
        self.marker.read(self.runner.working_dir())
    }

    async fn perform_update(
        &self,
        target: &Version,
        progress: &ProgressReporter,
    ) -> UpdateOutcome {
        info!(
            "Updating checkout towards {target} from {}",
            self.reset_target()
        );
        self.force_update(progress).await
    }
}
