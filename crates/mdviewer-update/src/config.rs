use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;
use crate::version::VersionMarker;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_VERSION_FILE: &str = "version.py";
pub const DEFAULT_MARKER_IDENTIFIER: &str = "__version__";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKUP_RETENTION: usize = 3;
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com";

/// Update bookkeeping directory inside the installation root.
pub const BACKUPS_DIR_NAME: &str = ".backups";
/// Version-control metadata inside a checkout.
pub const VCS_DIR_NAME: &str = ".git";

const DEFAULT_LOCAL_ONLY_ENTRIES: [&str; 2] =
    ["AGENTS.md", "LESSONS_LEARNED-MDviewer-implementation.md"];

static GITHUB_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:]([^/]+)/([^/]+?)(?:\.git)?/?$").expect("static pattern is valid")
});
static SHORT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^/\s]+)/([^/\s]+)$").expect("static pattern is valid"));

/// A hosted repository identified as `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    /// Normalise `owner/repo` or a GitHub URL (https or ssh, with or without
    /// `.git` and a trailing slash).
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRepository`] for anything else.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let input = input.trim();
        if !input.contains('/') {
            return Err(ConfigError::InvalidRepository(input.to_string()));
        }

        let captures = GITHUB_URL_PATTERN
            .captures(input)
            .or_else(|| SHORT_ID_PATTERN.captures(input))
            .ok_or_else(|| ConfigError::InvalidRepository(input.to_string()))?;

        Ok(Self {
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// `.zip` on Windows, `.tar.gz` everywhere else.
    #[must_use]
    pub fn for_current_platform() -> Self {
        if cfg!(windows) { Self::Zip } else { Self::TarGz }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Engine configuration. Every component receives the installation root
/// from here; nothing reads the process working directory.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub install_root: PathBuf,
    pub repository: RepositoryId,
    pub branch: String,
    pub remote: String,
    pub marker: VersionMarker,
    pub git_program: PathBuf,
    pub command_timeout: Duration,
    pub http_timeout: Duration,
    pub download_timeout: Duration,
    pub api_base_url: String,
    pub download_base_url: String,
    pub archive_format: ArchiveFormat,
    pub backup_retention: usize,
    pub local_only_entries: Vec<String>,
    pub user_agent: String,
}

impl UpdateConfig {
    /// # Errors
    /// Returns an error if `repository` is not a recognisable repository
    /// identifier.
    pub fn new(install_root: impl Into<PathBuf>, repository: &str) -> Result<Self, ConfigError> {
        let marker = VersionMarker::new(DEFAULT_VERSION_FILE, DEFAULT_MARKER_IDENTIFIER)
            .map_err(|error| ConfigError::InvalidMarker {
                identifier: DEFAULT_MARKER_IDENTIFIER.to_string(),
                details: error.to_string(),
            })?;

        Ok(Self {
            install_root: install_root.into(),
            repository: RepositoryId::parse(repository)?,
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            marker,
            git_program: PathBuf::from("git"),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            archive_format: ArchiveFormat::for_current_platform(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            local_only_entries: DEFAULT_LOCAL_ONLY_ENTRIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            user_agent: format!("MDviewer-Updater/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// # Errors
    /// Returns an error if the identifier cannot be turned into a pattern.
    pub fn with_version_marker(
        mut self,
        relative_path: impl Into<PathBuf>,
        identifier: &str,
    ) -> Result<Self, ConfigError> {
        self.marker = VersionMarker::new(relative_path, identifier).map_err(|error| {
            ConfigError::InvalidMarker {
                identifier: identifier.to_string(),
                details: error.to_string(),
            }
        })?;
        Ok(self)
    }

    #[must_use]
    pub fn with_git_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.git_program = program.into();
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        self.download_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    #[must_use]
    pub fn with_backup_retention(mut self, keep: usize) -> Self {
        self.backup_retention = keep;
        self
    }

    #[must_use]
    pub fn with_local_only_entries(mut self, entries: Vec<String>) -> Self {
        self.local_only_entries = entries;
        self
    }

    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.install_root.join(BACKUPS_DIR_NAME)
    }

    /// Source archive URL for a release tag on the download host.
    #[must_use]
    pub fn archive_url(&self, tag: &str) -> String {
        format!(
            "{}/{}/archive/refs/tags/{tag}.{}",
            self.download_base_url,
            self.repository,
            self.archive_format.extension()
        )
    }

    #[must_use]
    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/releases", self.api_base_url, self.repository)
    }

    #[must_use]
    pub fn clone_url(&self) -> String {
        format!("{}/{}.git", self.download_base_url, self.repository)
    }

    /// Shared HTTP client for release index queries and downloads.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.http_timeout)
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))
    }
}
