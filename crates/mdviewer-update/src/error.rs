use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Why a single engine step failed.
///
/// The display text is user-facing: callers show it verbatim in result
/// dialogs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("{operation} failed with status {status}")]
    HttpStatus { operation: &'static str, status: u16 },

    #[error("{}", command_failed_text(.exit_code, .stderr))]
    CommandFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} command not found. Is it installed and in PATH?")]
    ProgramNotFound { program: String },

    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("{0}")]
    PreconditionUnmet(String),

    #[error("{context}: {message}")]
    Io {
        context: &'static str,
        message: String,
    },
}

fn command_failed_text(exit_code: &Option<i32>, stderr: &str) -> String {
    match (stderr.is_empty(), exit_code) {
        (false, _) => stderr.to_string(),
        (true, Some(code)) => format!("command exited with status {code}"),
        (true, None) => "command terminated by signal".to_string(),
    }
}

impl FailureReason {
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionUnmet(message.into())
    }

    pub fn io(context: &'static str, source: &std::io::Error) -> Self {
        Self::Io {
            context,
            message: source.to_string(),
        }
    }

    pub fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::Io {
            context,
            message: format!("{}: {source}", path.display()),
        }
    }

    /// Classify a transport error, keeping timeouts distinct from other
    /// network failures.
    pub fn from_http(operation: &str, seconds: u64, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(operation, seconds)
        } else {
            Self::NetworkError(error.to_string())
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Raw diagnostic text for the outcome's error output: the command's
    /// standard error when there is one, the display text otherwise.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::CommandFailed { stderr, .. } if !stderr.is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}

/// A step of either update channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePhase {
    Resolving,
    Fetching,
    Resetting,
    Downloading,
    Extracting,
    BackingUp,
    Applying,
    RollingBack,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving latest version",
            Self::Fetching => "fetching",
            Self::Resetting => "resetting",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::BackingUp => "backing up",
            Self::Applying => "applying",
            Self::RollingBack => "rolling back",
        };
        f.write_str(name)
    }
}

/// A failure tagged with the phase it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseFailure {
    pub phase: UpdatePhase,
    pub reason: FailureReason,
    prefix: String,
}

impl PhaseFailure {
    pub fn new(phase: UpdatePhase, reason: FailureReason) -> Self {
        let prefix = match phase {
            UpdatePhase::Resolving => "Could not determine latest version",
            UpdatePhase::Fetching => "Failed to fetch from remote",
            UpdatePhase::Resetting => "Failed to reset",
            UpdatePhase::Downloading => "Download failed",
            UpdatePhase::Extracting => "Extraction failed",
            UpdatePhase::BackingUp => "Backup failed",
            UpdatePhase::Applying => "Update failed",
            UpdatePhase::RollingBack => "Rollback failed",
        };
        Self {
            phase,
            reason,
            prefix: prefix.to_string(),
        }
    }

    /// Replace the default message prefix, e.g. to name the reset target.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.prefix, self.reason)
    }
}

impl std::error::Error for PhaseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

/// Invalid engine configuration. This is the only error that escapes the
/// engine instead of becoming a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid repository URL format: {0}")]
    InvalidRepository(String),

    #[error("Invalid version marker identifier '{identifier}': {details}")]
    InvalidMarker { identifier: String, details: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::{FailureReason, PhaseFailure, UpdatePhase};

    #[test]
    fn timeout_display_names_operation_and_duration() {
        let reason = FailureReason::timeout("git fetch origin", 30);

        assert!(reason.is_timeout());
        assert_eq!(
            reason.to_string(),
            "git fetch origin timed out after 30 seconds"
        );
    }

    #[test]
    fn command_failed_display_prefers_stderr() {
        let with_stderr = FailureReason::CommandFailed {
            exit_code: Some(128),
            stderr: "fatal: could not read from remote".to_string(),
        };
        let without_stderr = FailureReason::CommandFailed {
            exit_code: Some(1),
            stderr: String::new(),
        };

        assert_eq!(with_stderr.to_string(), "fatal: could not read from remote");
        assert_eq!(without_stderr.to_string(), "command exited with status 1");
        assert!(!with_stderr.is_timeout());
    }

    #[test]
    fn phase_failure_uses_phase_prefix() {
        let download = PhaseFailure::new(
            UpdatePhase::Downloading,
            FailureReason::HttpStatus {
                operation: "Download",
                status: 404,
            },
        );
        let extract = PhaseFailure::new(
            UpdatePhase::Extracting,
            FailureReason::InvalidArchive("version.py not found".to_string()),
        );

        assert_eq!(
            download.to_string(),
            "Download failed: Download failed with status 404"
        );
        assert_eq!(
            extract.to_string(),
            "Extraction failed: Invalid archive: version.py not found"
        );
    }

    #[test]
    fn phase_failure_prefix_can_be_overridden() {
        let failure = PhaseFailure::new(
            UpdatePhase::Resetting,
            FailureReason::CommandFailed {
                exit_code: Some(128),
                stderr: "fatal: ambiguous argument".to_string(),
            },
        )
        .with_prefix("Failed to reset to origin/main");

        assert_eq!(
            failure.to_string(),
            "Failed to reset to origin/main: fatal: ambiguous argument"
        );
    }

    #[test]
    fn diagnostic_returns_raw_stderr() {
        let reason = FailureReason::CommandFailed {
            exit_code: Some(1),
            stderr: "error: pathspec".to_string(),
        };
        assert_eq!(reason.diagnostic(), "error: pathspec");

        let reason = FailureReason::precondition("No backup available for rollback");
        assert_eq!(reason.diagnostic(), "No backup available for rollback");
    }
}
