use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info, warn};

use crate::config::{BACKUPS_DIR_NAME, VCS_DIR_NAME};
use crate::error::FailureReason;
use crate::version::Version;

use super::tree;

const BACKUP_PREFIX: &str = "backup_";

fn is_bookkeeping(name: &std::ffi::OsStr) -> bool {
    name == BACKUPS_DIR_NAME || name == VCS_DIR_NAME
}

/// Snapshot every top-level entry of `install_root` (except update
/// bookkeeping, version-control metadata and transient artefacts) into a new
/// directory under `backups_dir`.
pub(crate) fn create_backup(
    install_root: &Path,
    backups_dir: &Path,
    current_version: Option<&Version>,
) -> Result<PathBuf, FailureReason> {
    std::fs::create_dir_all(backups_dir).map_err(|error| {
        FailureReason::io_with_path("failed to create backups directory", backups_dir, &error)
    })?;

    let backup_path = unique_backup_path(backups_dir, current_version);
    std::fs::create_dir(&backup_path).map_err(|error| {
        FailureReason::io_with_path("failed to create backup directory", &backup_path, &error)
    })?;

    for (name, path) in tree::top_level_entries(install_root)? {
        if is_bookkeeping(&name) || tree::is_transient(&name) {
            continue;
        }
        tree::copy_entry(&path, &backup_path.join(&name))?;
    }

    info!("Backup created at {}", backup_path.display());
    Ok(backup_path)
}

fn unique_backup_path(backups_dir: &Path, current_version: Option<&Version>) -> PathBuf {
    let version = current_version.map_or_else(|| "unknown".to_string(), ToString::to_string);
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let base = format!("{BACKUP_PREFIX}{version}_{timestamp}");

    let mut candidate = backups_dir.join(&base);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = backups_dir.join(format!("{base}_{suffix}"));
        suffix += 1;
    }
    candidate
}

fn created_at(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Existing backups, newest first.
pub(crate) fn list_backups(backups_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = tree::top_level_entries(backups_dir) else {
        return Vec::new();
    };

    let mut backups: Vec<(SystemTime, PathBuf)> = entries
        .into_iter()
        .filter(|(name, path)| {
            name.to_string_lossy().starts_with(BACKUP_PREFIX) && path.is_dir()
        })
        .map(|(_, path)| (created_at(&path), path))
        .collect();
    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    backups.into_iter().map(|(_, path)| path).collect()
}

/// Delete all but the `keep` newest backups. Returns how many were removed.
///
/// The newest backup always survives, even with `keep == 0`: it is the one a
/// pending apply would roll back to.
pub(crate) fn prune_backups(backups_dir: &Path, keep: usize) -> Result<usize, FailureReason> {
    let mut removed = 0;
    let mut last_error = None;

    for stale in list_backups(backups_dir).into_iter().skip(keep.max(1)) {
        match std::fs::remove_dir_all(&stale) {
            Ok(()) => {
                debug!("Removed old backup {}", stale.display());
                removed += 1;
            }
            Err(error) => {
                warn!("Failed to remove old backup {}: {error}", stale.display());
                last_error = Some(FailureReason::io_with_path(
                    "failed to remove old backup",
                    &stale,
                    &error,
                ));
            }
        }
    }

    match last_error {
        Some(error) => Err(error),
        None => Ok(removed),
    }
}

/// Replace the installation's top-level entries with the backup's. Running it
/// twice with the same backup produces the same tree.
pub(crate) fn restore_backup(install_root: &Path, backup: &Path) -> Result<(), FailureReason> {
    if !backup.is_dir() {
        return Err(FailureReason::precondition(
            "No backup available for rollback",
        ));
    }

    info!("Rolling back from backup {}", backup.display());
    for (name, path) in tree::top_level_entries(install_root)? {
        if is_bookkeeping(&name) {
            continue;
        }
        tree::remove_entry(&path)?;
    }

    for (name, path) in tree::top_level_entries(backup)? {
        tree::copy_entry(&path, &install_root.join(&name))?;
    }

    info!("Rollback complete");
    Ok(())
}
