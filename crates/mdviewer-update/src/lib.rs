//! Self-update engine for MDviewer.
//!
//! This crate decides whether a newer release exists and brings an
//! installation up to date through one of two channels:
//! - A version-control checkout, fetched and force-reset to the remote branch.
//! - A release archive install, downloaded, backed up, replaced and rolled
//!   back on failure.
//!
//! Every operation takes an explicit installation root from [`UpdateConfig`]
//! and reports failures as values rather than errors.

mod archive;
mod channel;
mod command;
mod config;
mod coordinator;
mod error;
mod git;
mod outcome;
mod release;
pub mod version;

/// Release-archive update channel.
pub use archive::ArchiveChannel;
/// Channel abstraction, installation detection and progress forwarding.
pub use channel::{InstallationKind, InstallationState, ProgressReporter, UpdateChannel};
/// Bounded external command runner.
pub use command::{CommandOutput, GitRunner};
/// Engine configuration and its defaults.
pub use config::{
    ArchiveFormat, BACKUPS_DIR_NAME, DEFAULT_BACKUP_RETENTION, DEFAULT_BRANCH,
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_MARKER_IDENTIFIER, DEFAULT_REMOTE, DEFAULT_VERSION_FILE, RepositoryId, UpdateConfig,
};
/// Check-and-update entry points.
pub use coordinator::UpdateCoordinator;
/// Failure taxonomy.
pub use error::{ConfigError, FailureReason, PhaseFailure, UpdatePhase};
/// Repository checkout update channel and its read-only queries.
pub use git::{RemoteInfo, RepositoryChannel, RepositoryStatus};
/// Result types shared by every update path.
pub use outcome::{
    ChannelDetails, ChannelKind, CommandRecord, UpdateCheckResult, UpdateOutcome, UpdateProgress,
    VersionSource,
};
/// Latest-version lookup.
pub use release::{GitHubRelease, LatestRelease, ReleaseResolver, latest_tag};
pub use version::{Version, VersionMarker, compare, is_newer_version};
