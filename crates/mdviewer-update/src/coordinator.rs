use log::{info, warn};

use crate::archive::ArchiveChannel;
use crate::channel::{InstallationKind, InstallationState, ProgressReporter, UpdateChannel};
use crate::config::UpdateConfig;
use crate::error::{ConfigError, FailureReason, PhaseFailure, UpdatePhase};
use crate::git::RepositoryChannel;
use crate::outcome::{ChannelDetails, UpdateCheckResult, UpdateOutcome, UpdateProgress};
use crate::release::ReleaseResolver;
use crate::version::Version;

/// Sequences resolve, compare and channel invocation for one installation
/// root.
#[derive(Debug)]
pub struct UpdateCoordinator {
    config: UpdateConfig,
    resolver: ReleaseResolver,
    repository: RepositoryChannel,
    archive: ArchiveChannel,
    progress: ProgressReporter,
}

impl UpdateCoordinator {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: UpdateConfig) -> Result<Self, ConfigError> {
        let client = config.http_client()?;
        Ok(Self {
            resolver: ReleaseResolver::new(&config, client.clone()),
            repository: RepositoryChannel::new(&config),
            archive: ArchiveChannel::new(config.clone(), client),
            progress: ProgressReporter::silent(),
            config,
        })
    }

    /// Forward progress events to `sender` for subsequent updates.
    #[must_use]
    pub fn with_progress(mut self, sender: tokio::sync::mpsc::Sender<UpdateProgress>) -> Self {
        self.progress = ProgressReporter::new(sender);
        self
    }

    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    #[must_use]
    pub fn installation(&self) -> InstallationState {
        InstallationState::detect(&self.config.install_root, &self.config.marker)
    }

    #[must_use]
    pub fn repository_channel(&self) -> &RepositoryChannel {
        &self.repository
    }

    #[must_use]
    pub fn archive_channel(&self) -> &ArchiveChannel {
        &self.archive
    }

    fn channel_for(&self, kind: InstallationKind) -> &dyn UpdateChannel {
        match kind {
            InstallationKind::RepositoryCheckout => &self.repository,
            InstallationKind::ArchiveInstall => &self.archive,
        }
    }

    /// Resolve the latest version and compare it with the installed one.
    /// Never fails: missing information is reported through `error`.
    pub async fn check_for_update(&self) -> UpdateCheckResult {
        let current_version = self.installation().version;

        let latest = match self.resolver.resolve().await {
            Ok(latest) => latest,
            Err(message) => {
                warn!("Update check failed: {message}");
                return UpdateCheckResult::unavailable(current_version, message);
            }
        };

        let Some(current) = current_version else {
            let message = format!(
                "Could not read installed version from {}",
                self.config
                    .marker
                    .path_in(&self.config.install_root)
                    .display()
            );
            warn!("{message}");
            return UpdateCheckResult {
                has_update: false,
                current_version: None,
                latest_version: Some(latest.version),
                release_notes: latest.notes,
                source: Some(latest.source),
                error: Some(message),
            };
        };

        let has_update = latest.version > current;
        info!(
            "Update check: current {current}, latest {} ({})",
            latest.version,
            if has_update { "update available" } else { "up to date" }
        );

        UpdateCheckResult {
            has_update,
            current_version: Some(current),
            latest_version: Some(latest.version),
            release_notes: latest.notes,
            source: Some(latest.source),
            error: None,
        }
    }

    /// Full cycle: check, then update through the matching channel when a
    /// newer version exists.
    pub async fn perform_update(&self) -> UpdateOutcome {
        self.progress.phase(UpdatePhase::Resolving).await;
        let check = self.check_for_update().await;

        if let Some(error) = check.error {
            let mut outcome = UpdateOutcome::new(ChannelDetails::NotInvoked, check.current_version);
            outcome.fail(
                PhaseFailure::new(UpdatePhase::Resolving, FailureReason::precondition(error))
                    .with_prefix("Update check failed"),
            );
            return outcome;
        }

        match check.latest_version {
            Some(latest) if check.has_update => self.apply_version(&latest).await,
            _ => {
                let mut outcome =
                    UpdateOutcome::new(ChannelDetails::NotInvoked, check.current_version.clone());
                outcome.success = true;
                outcome.new_version = check.current_version;
                outcome.message = "Already up to date".to_string();
                outcome
            }
        }
    }

    /// Run the channel matching the installation towards `target`, without
    /// re-resolving.
    pub async fn apply_version(&self, target: &Version) -> UpdateOutcome {
        let installation = self.installation();
        let channel = self.channel_for(installation.kind);
        info!(
            "Updating {} via {} to {target}",
            installation.root.display(),
            channel.kind()
        );
        channel.perform_update(target, &self.progress).await
    }
}
