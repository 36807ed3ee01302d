use std::path::Path;

use log::{debug, info};

use crate::error::FailureReason;

use super::tree;

/// Replace the installation's top-level entries with those of `content_root`.
///
/// Dot-prefixed entries and the names in `excluded` are never installed. Each
/// entry is removed then copied, so a failure leaves a mixed tree. Returns the
/// number of entries installed.
pub(crate) fn apply_update(
    content_root: &Path,
    install_root: &Path,
    excluded: &[String],
) -> Result<usize, FailureReason> {
    let mut applied = 0;

    for (name, src) in tree::top_level_entries(content_root)? {
        let display = name.to_string_lossy();
        if display.starts_with('.') || excluded.iter().any(|entry| *entry == display) {
            debug!("Skipping {display}");
            continue;
        }

        let dest = install_root.join(&name);
        if std::fs::symlink_metadata(&dest).is_ok() {
            tree::remove_entry(&dest)?;
        }
        tree::copy_entry(&src, &dest)?;
        applied += 1;
    }

    info!("Applied {applied} entries to {}", install_root.display());
    Ok(applied)
}
