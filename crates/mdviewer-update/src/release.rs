use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;

use crate::command::GitRunner;
use crate::config::{UpdateConfig, VCS_DIR_NAME};
use crate::error::FailureReason;
use crate::outcome::VersionSource;
use crate::version::Version;

static RELEASE_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+\.\d+$").expect("static pattern is valid"));

const TAG_GLOB: &str = "v*.*.*";
const TAG_REF_PREFIX: &str = "refs/tags/";

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

/// The newest published version and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    pub version: Version,
    pub notes: Option<String>,
    pub source: VersionSource,
}

/// Determines the latest published version without touching the
/// installation: the hosted release index first, the remote tag list second.
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: reqwest::Client,
    releases_url: String,
    http_timeout: std::time::Duration,
    tags: GitRunner,
    tag_source: String,
}

impl ReleaseResolver {
    #[must_use]
    pub fn new(config: &UpdateConfig, client: reqwest::Client) -> Self {
        // A checkout can ask its own remote; an archive install has no remote
        // configured and queries the hosted repository directly.
        let tag_source = if config.install_root.join(VCS_DIR_NAME).exists() {
            config.remote.clone()
        } else {
            config.clone_url()
        };

        Self {
            client,
            releases_url: config.releases_url(),
            http_timeout: config.http_timeout,
            tags: GitRunner::new(
                &config.git_program,
                &config.install_root,
                config.command_timeout,
            ),
            tag_source,
        }
    }

    /// Resolve the latest version.
    ///
    /// # Errors
    /// Returns a user-facing description covering both lookups when neither
    /// yields a version.
    pub async fn resolve(&self) -> Result<LatestRelease, String> {
        let index_error = match self.from_release_index().await {
            Ok(Some(release)) => return Ok(release),
            Ok(None) => "no published releases".to_string(),
            Err(reason) => reason.to_string(),
        };
        warn!("Release index unavailable ({index_error}), falling back to tag list");

        let tags_error = match self.from_tag_list().await {
            Ok(Some(release)) => return Ok(release),
            Ok(None) => "no matching version tags".to_string(),
            Err(reason) => reason.to_string(),
        };
        warn!("Tag list lookup failed: {tags_error}");

        Err(format!(
            "Could not determine latest version (release index: {index_error}; tag list: {tags_error})"
        ))
    }

    async fn from_release_index(&self) -> Result<Option<LatestRelease>, FailureReason> {
        let seconds = self.http_timeout.as_secs();
        debug!("Querying release index: {}", self.releases_url);

        let response = self
            .client
            .get(&self.releases_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .timeout(self.http_timeout)
            .send()
            .await
            .map_err(|error| FailureReason::from_http("Release index query", seconds, &error))?;

        if !response.status().is_success() {
            return Err(FailureReason::HttpStatus {
                operation: "Release index query",
                status: response.status().as_u16(),
            });
        }

        let releases: Vec<GitHubRelease> = response.json().await.map_err(|error| {
            if error.is_timeout() {
                FailureReason::timeout("Release index query", seconds)
            } else {
                FailureReason::NetworkError(format!("malformed release data: {error}"))
            }
        })?;

        let latest = releases
            .into_iter()
            .filter(|release| !release.draft)
            .find(|release| has_numeric_component(&release.tag_name))
            .map(|release| LatestRelease {
                version: Version::parse(&release.tag_name),
                notes: release.body,
                source: VersionSource::ReleaseIndex,
            });

        if let Some(release) = &latest {
            info!("Latest release from index: {}", release.version);
        }
        Ok(latest)
    }

    async fn from_tag_list(&self) -> Result<Option<LatestRelease>, FailureReason> {
        let output = self
            .tags
            .run(&["ls-remote", "--tags", "--refs", &self.tag_source, TAG_GLOB])
            .await?;

        let latest = latest_tag(&output.stdout).map(|tag| {
            info!("Latest release from tag list: {tag}");
            LatestRelease {
                version: Version::parse(tag),
                notes: None,
                source: VersionSource::TagList,
            }
        });
        Ok(latest)
    }
}

fn has_numeric_component(tag: &str) -> bool {
    tag.chars().any(|ch| ch.is_ascii_digit())
}

/// Pick the lexicographically greatest `v<n>.<n>.<n>` tag from a tag listing.
/// Accepts both `ls-remote` lines (`<sha>\trefs/tags/<tag>`) and bare tag
/// names.
#[must_use]
pub fn latest_tag(listing: &str) -> Option<&str> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(|name| name.strip_prefix(TAG_REF_PREFIX).unwrap_or(name))
        .filter(|tag| RELEASE_TAG_PATTERN.is_match(tag))
        .max()
}
