use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::VCS_DIR_NAME;
use crate::error::UpdatePhase;
use crate::outcome::{ChannelKind, UpdateOutcome, UpdateProgress};
use crate::version::{Version, VersionMarker};

/// How the running copy was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationKind {
    RepositoryCheckout,
    ArchiveInstall,
}

impl InstallationKind {
    #[must_use]
    pub fn channel_kind(self) -> ChannelKind {
        match self {
            Self::RepositoryCheckout => ChannelKind::Repository,
            Self::ArchiveInstall => ChannelKind::ReleaseArchive,
        }
    }
}

/// What is installed where, inspected once per update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationState {
    pub root: PathBuf,
    pub kind: InstallationKind,
    pub version: Option<Version>,
}

impl InstallationState {
    /// A root holding version-control metadata (a `.git` directory, or a
    /// `.git` file for worktrees) is a checkout; anything else is an archive
    /// install.
    #[must_use]
    pub fn detect(root: &Path, marker: &VersionMarker) -> Self {
        let kind = if root.join(VCS_DIR_NAME).exists() {
            InstallationKind::RepositoryCheckout
        } else {
            InstallationKind::ArchiveInstall
        };

        Self {
            root: root.to_path_buf(),
            kind,
            version: marker.read(root),
        }
    }
}

/// Forwards progress events to an optional listener. A dropped receiver is
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<UpdateProgress>>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(sender: mpsc::Sender<UpdateProgress>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    pub async fn phase(&self, phase: UpdatePhase) {
        self.send(UpdateProgress::Phase(phase)).await;
    }

    pub async fn send(&self, event: UpdateProgress) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event).await;
        }
    }
}

/// One of the two mutually exclusive update strategies.
#[async_trait]
pub trait UpdateChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Version recorded by the local marker file, if readable.
    fn current_version(&self) -> Option<Version>;

    /// Bring the installation to `target` (or the remote tip, for channels
    /// that cannot pin a version). Never panics or returns an error: every
    /// failure is reported inside the outcome.
    async fn perform_update(
        &self,
        target: &Version,
        progress: &ProgressReporter,
    ) -> UpdateOutcome;
}
