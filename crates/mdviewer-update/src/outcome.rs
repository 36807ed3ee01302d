use std::fmt;
use std::path::PathBuf;

use crate::error::{PhaseFailure, UpdatePhase};
use crate::version::Version;

/// Where the latest version information came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    ReleaseIndex,
    TagList,
}

/// Result of a single update check. Never persisted.
///
/// `error` set with `has_update == false` means "no information", which is
/// distinct from a confirmed up-to-date installation (`error` unset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckResult {
    pub has_update: bool,
    pub current_version: Option<Version>,
    pub latest_version: Option<Version>,
    pub release_notes: Option<String>,
    pub source: Option<VersionSource>,
    pub error: Option<String>,
}

impl UpdateCheckResult {
    #[must_use]
    pub fn unavailable(current_version: Option<Version>, error: impl Into<String>) -> Self {
        Self {
            has_update: false,
            current_version,
            latest_version: None,
            release_notes: None,
            source: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        !self.has_update && self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Repository,
    ReleaseArchive,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository => write!(f, "git repository"),
            Self::ReleaseArchive => write!(f, "release archive download"),
        }
    }
}

/// One external command as recorded in a repository-channel transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
}

/// Channel-specific detail attached to an [`UpdateOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelDetails {
    Repository {
        transcript: Vec<CommandRecord>,
    },
    ReleaseArchive {
        download_url: String,
        backup_location: Option<PathBuf>,
        rolled_back: bool,
    },
    /// No channel ran: the installation was already current or no version
    /// information was available.
    NotInvoked,
}

/// The single result shape produced by every update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub success: bool,
    pub message: String,
    pub current_version: Option<Version>,
    pub new_version: Option<Version>,
    pub diagnostic_output: String,
    pub error_output: String,
    pub failure: Option<PhaseFailure>,
    pub details: ChannelDetails,
}

impl UpdateOutcome {
    pub(crate) fn new(details: ChannelDetails, current_version: Option<Version>) -> Self {
        Self {
            success: false,
            message: String::new(),
            current_version,
            new_version: None,
            diagnostic_output: String::new(),
            error_output: String::new(),
            failure: None,
            details,
        }
    }

    pub(crate) fn fail(&mut self, failure: PhaseFailure) {
        self.success = false;
        self.message = failure.to_string();
        self.error_output = failure.reason.diagnostic();
        self.failure = Some(failure);
    }

    #[must_use]
    pub fn channel_kind(&self) -> Option<ChannelKind> {
        match self.details {
            ChannelDetails::Repository { .. } => Some(ChannelKind::Repository),
            ChannelDetails::ReleaseArchive { .. } => Some(ChannelKind::ReleaseArchive),
            ChannelDetails::NotInvoked => None,
        }
    }

    #[must_use]
    pub fn backup_location(&self) -> Option<&PathBuf> {
        match &self.details {
            ChannelDetails::ReleaseArchive {
                backup_location, ..
            } => backup_location.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn failed_phase(&self) -> Option<UpdatePhase> {
        self.failure.as_ref().map(|failure| failure.phase)
    }
}

/// Progress events emitted while a channel runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateProgress {
    Phase(UpdatePhase),
    Downloading { downloaded: u64, total: u64 },
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ChannelDetails, ChannelKind, UpdateCheckResult, UpdateOutcome};
    use crate::error::{FailureReason, PhaseFailure, UpdatePhase};
    use crate::version::Version;

    #[test]
    fn unavailable_check_is_not_up_to_date() {
        let result = UpdateCheckResult::unavailable(Some(Version::parse("0.3.0")), "offline");

        assert!(!result.has_update);
        assert!(!result.is_up_to_date());
        assert_eq!(result.error.as_deref(), Some("offline"));
    }

    #[test]
    fn fail_records_message_and_diagnostic() {
        let mut outcome = UpdateOutcome::new(
            ChannelDetails::Repository {
                transcript: Vec::new(),
            },
            Some(Version::parse("0.3.0")),
        );

        outcome.fail(PhaseFailure::new(
            UpdatePhase::Fetching,
            FailureReason::CommandFailed {
                exit_code: Some(128),
                stderr: "fatal: unable to access".to_string(),
            },
        ));

        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Failed to fetch from remote: fatal: unable to access"
        );
        assert_eq!(outcome.error_output, "fatal: unable to access");
        assert_eq!(outcome.failed_phase(), Some(UpdatePhase::Fetching));
        assert_eq!(outcome.channel_kind(), Some(ChannelKind::Repository));
        assert!(outcome.backup_location().is_none());
    }

    #[test]
    fn backup_location_is_exposed_for_archive_outcomes() {
        let outcome = UpdateOutcome::new(
            ChannelDetails::ReleaseArchive {
                download_url: "https://example.invalid/v1.tar.gz".to_string(),
                backup_location: Some(PathBuf::from("/opt/app/.backups/backup_1")),
                rolled_back: false,
            },
            None,
        );

        assert_eq!(outcome.channel_kind(), Some(ChannelKind::ReleaseArchive));
        assert_eq!(
            outcome.backup_location(),
            Some(&PathBuf::from("/opt/app/.backups/backup_1"))
        );
    }
}
