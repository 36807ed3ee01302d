use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;

/// A release version ordered only by its numeric `major.minor.patch` prefix.
///
/// The original text is kept for display, so `v0.3.1-rc1` prints as written
/// but compares equal to `0.3.1`.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    raw: String,
}

impl Version {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            raw: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Parse any string into a version. Never fails: unparseable input yields
    /// `0.0.0` while keeping the original text.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let (major, minor, patch) = parse(input);
        Self {
            major,
            minor,
            patch,
            raw: input.trim().to_string(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Release tag for this version, e.g. `v0.3.1`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{}", self.raw.trim_start_matches(['v', 'V']))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extract `(major, minor, patch)` from the leading numeric runs of `input`.
///
/// Any non-digit run is a separator; missing components default to zero and
/// anything past the third numeric run is ignored.
#[must_use]
pub fn parse(input: &str) -> (u64, u64, u64) {
    let mut parts = input
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().unwrap_or(u64::MAX));

    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    (major, minor, patch)
}

/// Total order over version strings using [`parse`].
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    parse(a).cmp(&parse(b))
}

#[must_use]
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    compare(latest, current) == Ordering::Greater
}

/// The local file recording the installed version, e.g. `version.py` holding
/// `__version__ = "0.3.1"`.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    relative_path: PathBuf,
    pattern: Regex,
}

impl VersionMarker {
    /// # Errors
    /// Returns an error if `identifier` produces an invalid pattern, which can
    /// only happen for pathological identifiers.
    pub fn new(relative_path: impl Into<PathBuf>, identifier: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"{}\s*=\s*["']([^"']+)["']"#,
            regex::escape(identifier)
        ))?;
        Ok(Self {
            relative_path: relative_path.into(),
            pattern,
        })
    }

    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    #[must_use]
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }

    #[must_use]
    pub fn exists_in(&self, root: &Path) -> bool {
        self.path_in(root).is_file()
    }

    /// Extract the version assignment from arbitrary file content.
    #[must_use]
    pub fn extract(&self, content: &str) -> Option<Version> {
        self.pattern
            .captures(content)
            .and_then(|captures| captures.get(1))
            .map(|value| Version::parse(value.as_str()))
    }

    /// Read the installed version under `root`. Missing or unreadable files
    /// yield `None`.
    #[must_use]
    pub fn read(&self, root: &Path) -> Option<Version> {
        let path = self.path_in(root);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("Version marker not found at {}", path.display());
                return None;
            }
            Err(error) => {
                warn!("Failed to read version marker {}: {error}", path.display());
                return None;
            }
        };

        let version = self.extract(&content);
        if version.is_none() {
            warn!("No version assignment found in {}", path.display());
        }
        version
    }
}
