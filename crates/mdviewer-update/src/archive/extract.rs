use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, warn};

use crate::config::ArchiveFormat;
use crate::error::FailureReason;
use crate::version::VersionMarker;

use super::tree;

/// Unpack `archive_path` into `dest` using the given format.
pub(crate) fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    format: ArchiveFormat,
) -> Result<(), FailureReason> {
    std::fs::create_dir_all(dest).map_err(|error| {
        FailureReason::io_with_path("failed to create extraction directory", dest, &error)
    })?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest)?,
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), FailureReason> {
    let file = std::fs::File::open(zip_path).map_err(|error| {
        FailureReason::io_with_path("failed to open zip file", zip_path, &error)
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| FailureReason::InvalidArchive(format!("failed to read zip: {error}")))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|error| {
            FailureReason::InvalidArchive(format!("failed to read zip entry: {error}"))
        })?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                FailureReason::io_with_path(
                    "failed to create extraction directory",
                    &out_path,
                    &error,
                )
            })?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    FailureReason::io_with_path(
                        "failed to create extraction parent directory",
                        parent,
                        &error,
                    )
                })?;
            }
            let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
                FailureReason::io_with_path("failed to create extracted file", &out_path, &error)
            })?;
            std::io::copy(&mut entry, &mut outfile).map_err(|error| {
                FailureReason::io_with_path("failed to extract archive entry", &out_path, &error)
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let _ =
                        std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
                }
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(tar_path: &Path, dest: &Path) -> Result<(), FailureReason> {
    let file = std::fs::File::open(tar_path).map_err(|error| {
        FailureReason::io_with_path("failed to open tar.gz file", tar_path, &error)
    })?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    // Entries escaping `dest` are skipped by `unpack`.
    archive
        .unpack(dest)
        .map_err(|error| FailureReason::InvalidArchive(format!("failed to unpack tar.gz: {error}")))
}

/// Hosted source archives wrap everything in one `<Project>-<version>/`
/// directory. Use it as the content root when it is the only entry.
pub(crate) fn content_root(extract_dir: &Path) -> Result<PathBuf, FailureReason> {
    let entries = tree::top_level_entries(extract_dir)?;
    if let [(_, only)] = entries.as_slice()
        && only.is_dir()
    {
        debug!("Using wrapped content root {}", only.display());
        return Ok(only.clone());
    }
    Ok(extract_dir.to_path_buf())
}

/// The content root must carry the version marker to count as a release.
pub(crate) fn validate_content(root: &Path, marker: &VersionMarker) -> Result<(), FailureReason> {
    if marker.exists_in(root) {
        Ok(())
    } else {
        Err(FailureReason::InvalidArchive(format!(
            "{} not found",
            marker.relative_path().display()
        )))
    }
}
