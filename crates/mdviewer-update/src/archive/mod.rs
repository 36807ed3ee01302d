//! Release-archive channel: download, extract, back up, apply, and roll back
//! when applying fails.

mod apply;
mod backup;
mod download;
mod extract;
mod tree;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{error, info, warn};

use crate::channel::{ProgressReporter, UpdateChannel};
use crate::config::{BACKUPS_DIR_NAME, UpdateConfig, VCS_DIR_NAME};
use crate::error::{FailureReason, PhaseFailure, UpdatePhase};
use crate::outcome::{ChannelDetails, ChannelKind, UpdateOutcome};
use crate::version::Version;

const TEMP_PREFIX: &str = "mdviewer_update_";

/// What the pipeline did before it stopped, successful or not.
#[derive(Debug, Default)]
struct PipelineState {
    backup_location: Option<PathBuf>,
    rollback: Option<Result<(), FailureReason>>,
    log: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveChannel {
    config: UpdateConfig,
    client: reqwest::Client,
}

impl ArchiveChannel {
    #[must_use]
    pub fn new(config: UpdateConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Existing backups of this installation, newest first.
    #[must_use]
    pub fn backups(&self) -> Vec<PathBuf> {
        backup::list_backups(&self.config.backups_dir())
    }

    /// Restore the installation from `backup`.
    ///
    /// # Errors
    /// Returns [`FailureReason::PreconditionUnmet`] when `backup` does not
    /// exist, or an I/O failure if the tree cannot be restored.
    pub fn rollback(&self, backup: &Path) -> Result<(), FailureReason> {
        backup::restore_backup(&self.config.install_root, backup)
    }

    fn excluded_entries(&self) -> Vec<String> {
        let mut excluded = vec![BACKUPS_DIR_NAME.to_string(), VCS_DIR_NAME.to_string()];
        excluded.extend(self.config.local_only_entries.iter().cloned());
        excluded
    }

    async fn run_pipeline(
        &self,
        target: &Version,
        download_url: &str,
        workspace: &Path,
        current_version: Option<&Version>,
        progress: &ProgressReporter,
        state: &mut PipelineState,
    ) -> Result<(), PhaseFailure> {
        let root = &self.config.install_root;
        let format = self.config.archive_format;

        progress.phase(UpdatePhase::Downloading).await;
        info!("Downloading {download_url}");
        let archive_path = workspace.join(format!("{}.{}", target.tag(), format.extension()));
        let bytes = download::download_file(
            &self.client,
            download_url,
            &archive_path,
            self.config.download_timeout,
            progress,
        )
        .await
        .map_err(|reason| PhaseFailure::new(UpdatePhase::Downloading, reason))?;
        let _ = writeln!(state.log, "Downloaded {bytes} bytes from {download_url}");

        progress.phase(UpdatePhase::Extracting).await;
        let extract_dir = workspace.join("extracted");
        let content_root = extract::extract_archive(&archive_path, &extract_dir, format)
            .and_then(|()| extract::content_root(&extract_dir))
            .and_then(|content_root| {
                extract::validate_content(&content_root, &self.config.marker)
                    .map(|()| content_root)
            })
            .map_err(|reason| PhaseFailure::new(UpdatePhase::Extracting, reason))?;
        let _ = writeln!(state.log, "Extracted to {}", content_root.display());

        progress.phase(UpdatePhase::BackingUp).await;
        let backups_dir = self.config.backups_dir();
        let backup_path = backup::create_backup(root, &backups_dir, current_version)
            .map_err(|reason| PhaseFailure::new(UpdatePhase::BackingUp, reason))?;
        state.backup_location = Some(backup_path.clone());
        let _ = writeln!(state.log, "Backup created at {}", backup_path.display());

        match backup::prune_backups(&backups_dir, self.config.backup_retention) {
            Ok(0) => {}
            Ok(removed) => info!("Pruned {removed} old backup(s)"),
            Err(reason) => warn!("Backup pruning failed: {reason}"),
        }

        progress.phase(UpdatePhase::Applying).await;
        match apply::apply_update(&content_root, root, &self.excluded_entries()) {
            Ok(applied) => {
                let _ = writeln!(state.log, "Applied {applied} entries");
                Ok(())
            }
            Err(reason) => {
                error!("Apply failed: {reason}");
                progress.phase(UpdatePhase::RollingBack).await;
                let rollback = backup::restore_backup(root, &backup_path);
                if let Err(rollback_error) = &rollback {
                    error!("Rollback failed: {rollback_error}");
                }
                state.rollback = Some(rollback);
                Err(PhaseFailure::new(UpdatePhase::Applying, reason))
            }
        }
    }
}

fn cleanup(workspace: tempfile::TempDir) {
    let path = workspace.path().to_path_buf();
    match workspace.close() {
        Ok(()) => info!("Removed temporary update directory {}", path.display()),
        Err(error) => warn!(
            "Failed to remove temporary update directory {}: {error}",
            path.display()
        ),
    }
}

#[async_trait]
impl UpdateChannel for ArchiveChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ReleaseArchive
    }

    fn current_version(&self) -> Option<Version> {
        self.config.marker.read(&self.config.install_root)
    }

    async fn perform_update(
        &self,
        target: &Version,
        progress: &ProgressReporter,
    ) -> UpdateOutcome {
        let current_version = self.current_version();
        let download_url = self.config.archive_url(&target.tag());
        info!(
            "Updating archive install at {} to {target}",
            self.config.install_root.display()
        );

        let mut state = PipelineState::default();
        let result = match tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir() {
            Ok(workspace) => {
                let result = self
                    .run_pipeline(
                        target,
                        &download_url,
                        workspace.path(),
                        current_version.as_ref(),
                        progress,
                        &mut state,
                    )
                    .await;
                cleanup(workspace);
                result
            }
            Err(error) => Err(PhaseFailure::new(
                UpdatePhase::Downloading,
                FailureReason::io("failed to create temporary directory", &error),
            )),
        };

        let rolled_back = matches!(state.rollback, Some(Ok(())));
        let mut outcome = UpdateOutcome::new(
            ChannelDetails::ReleaseArchive {
                download_url,
                backup_location: state.backup_location,
                rolled_back,
            },
            current_version,
        );
        outcome.diagnostic_output = state.log;

        match result {
            Ok(()) => {
                let new_version = self.current_version().unwrap_or_else(|| target.clone());
                info!("Archive update complete: {new_version}");
                outcome.success = true;
                outcome.message = format!("Successfully updated to version {new_version}");
                outcome.new_version = Some(new_version);
            }
            Err(failure) => {
                outcome.fail(failure);
                match state.rollback {
                    Some(Ok(())) => outcome.message.push_str(" (Rolled back to previous version)"),
                    Some(Err(rollback_error)) => {
                        let _ = write!(
                            outcome.message,
                            " (Rollback also failed: {rollback_error})"
                        );
                    }
                    None => {}
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::{TEMP_PREFIX, cleanup};

    #[test]
    fn cleanup_removes_workspace_with_contents() {
        let workspace = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .expect("workspace should be created");
        let path = workspace.path().to_path_buf();
        std::fs::create_dir_all(path.join("extracted/MDviewer-0.3.1"))
            .expect("extracted tree should be created");
        std::fs::write(path.join("v0.3.1.tar.gz"), b"archive").expect("archive should be written");

        cleanup(workspace);

        assert!(!path.exists());
    }
}
