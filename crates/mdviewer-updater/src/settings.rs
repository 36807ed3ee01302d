use std::path::{Path, PathBuf};
use std::time::Duration;

use mdviewer_platform::AppPaths;
use mdviewer_update::{ConfigError, UpdateConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_version_file")]
    pub version_file: PathBuf,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_check_deadline")]
    pub check_deadline_secs: u64,

    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_repository() -> String {
    "juren53/MDviewer".to_string()
}

fn default_branch() -> String {
    mdviewer_update::DEFAULT_BRANCH.to_string()
}

fn default_remote() -> String {
    mdviewer_update::DEFAULT_REMOTE.to_string()
}

fn default_version_file() -> PathBuf {
    PathBuf::from(mdviewer_update::DEFAULT_VERSION_FILE)
}

fn default_command_timeout() -> u64 {
    mdviewer_update::DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_http_timeout() -> u64 {
    mdviewer_update::DEFAULT_HTTP_TIMEOUT.as_secs()
}

fn default_download_timeout() -> u64 {
    mdviewer_update::DEFAULT_DOWNLOAD_TIMEOUT.as_secs()
}

fn default_check_deadline() -> u64 {
    15
}

fn default_backup_retention() -> usize {
    mdviewer_update::DEFAULT_BACKUP_RETENTION
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            branch: default_branch(),
            remote: default_remote(),
            version_file: default_version_file(),
            command_timeout_secs: default_command_timeout(),
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            check_deadline_secs: default_check_deadline(),
            backup_retention: default_backup_retention(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl UpdaterSettings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from(&paths.settings_file())
    }

    /// Missing, unreadable or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        let paths = AppPaths::new().map_err(std::io::Error::other)?;
        paths.ensure_dirs()?;
        self.save_to(&paths.settings_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    #[must_use]
    pub fn check_deadline(&self) -> Duration {
        Duration::from_secs(self.check_deadline_secs)
    }

    /// Engine configuration for the installation at `install_root`.
    pub fn to_config(&self, install_root: &Path) -> Result<UpdateConfig, ConfigError> {
        Ok(UpdateConfig::new(install_root, &self.repository)?
            .with_branch(&self.branch)
            .with_remote(&self.remote)
            .with_version_marker(
                &self.version_file,
                mdviewer_update::DEFAULT_MARKER_IDENTIFIER,
            )?
            .with_command_timeout(Duration::from_secs(self.command_timeout_secs))
            .with_http_timeout(Duration::from_secs(self.http_timeout_secs))
            .with_download_timeout(Duration::from_secs(self.download_timeout_secs))
            .with_backup_retention(self.backup_retention))
    }
}
