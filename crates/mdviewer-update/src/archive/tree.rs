use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::FailureReason;

const TRANSIENT_DIRS: [&str; 2] = ["__pycache__", ".pytest_cache"];
const TRANSIENT_EXTENSION: &str = "pyc";

/// Cache and bytecode artefacts that are never backed up or installed.
pub(crate) fn is_transient(name: &OsStr) -> bool {
    TRANSIENT_DIRS.iter().any(|dir| name == OsStr::new(dir))
        || Path::new(name)
            .extension()
            .is_some_and(|ext| ext == TRANSIENT_EXTENSION)
}

/// Top-level entries of `dir`, sorted by name.
pub(crate) fn top_level_entries(dir: &Path) -> Result<Vec<(OsString, PathBuf)>, FailureReason> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)
        .map_err(|error| FailureReason::io_with_path("failed to read directory", dir, &error))?
    {
        let entry =
            entry.map_err(|error| FailureReason::io("failed to read directory entry", &error))?;
        entries.push((entry.file_name(), entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Remove a file, symlink or whole directory tree.
pub(crate) fn remove_entry(path: &Path) -> Result<(), FailureReason> {
    let metadata = std::fs::symlink_metadata(path)
        .map_err(|error| FailureReason::io_with_path("failed to inspect entry", path, &error))?;
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|error| FailureReason::io_with_path("failed to remove entry", path, &error))
}

/// Copy a file or directory tree to `dest`, following symlinks and skipping
/// transient artefacts below the top level.
pub(crate) fn copy_entry(src: &Path, dest: &Path) -> Result<(), FailureReason> {
    if src.is_dir() {
        copy_tree(src, dest)
    } else {
        copy_file(src, dest)
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), FailureReason> {
    std::fs::create_dir_all(dest)
        .map_err(|error| FailureReason::io_with_path("failed to create directory", dest, &error))?;

    for (name, src_path) in top_level_entries(src)? {
        if is_transient(&name) {
            continue;
        }
        copy_entry(&src_path, &dest.join(&name))?;
    }
    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> Result<(), FailureReason> {
    std::fs::copy(src, dest).map_err(|error| FailureReason::Io {
        context: "failed to copy file",
        message: format!("{} -> {}: {error}", src.display(), dest.display()),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(src)
            .map_err(|error| FailureReason::io_with_path("failed to read permissions", src, &error))?
            .permissions()
            .mode();
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode)).map_err(
            |error| FailureReason::io_with_path("failed to set permissions", dest, &error),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::{copy_entry, is_transient, remove_entry, top_level_entries};

    #[test]
    fn transient_artefacts_are_recognised() {
        assert!(is_transient(OsStr::new("__pycache__")));
        assert!(is_transient(OsStr::new(".pytest_cache")));
        assert!(is_transient(OsStr::new("viewer.cpython-312.pyc")));
        assert!(!is_transient(OsStr::new("viewer.py")));
        assert!(!is_transient(OsStr::new("docs")));
    }

    #[test]
    fn copy_entry_copies_tree_without_transient_artefacts() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("pkg/__pycache__")).expect("dirs should be created");
        std::fs::write(src.join("pkg/viewer.py"), "print()").expect("file should be written");
        std::fs::write(src.join("pkg/viewer.pyc"), "bytecode").expect("file should be written");
        std::fs::write(src.join("pkg/__pycache__/x.pyc"), "bytecode")
            .expect("file should be written");

        let dest = temp.path().join("dest");
        copy_entry(&src, &dest).expect("tree should be copied");

        assert!(dest.join("pkg/viewer.py").is_file());
        assert!(!dest.join("pkg/viewer.pyc").exists());
        assert!(!dest.join("pkg/__pycache__").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_entry_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir should be created");
        let src = temp.path().join("run.sh");
        std::fs::write(&src, "#!/bin/sh\n").expect("file should be written");
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755))
            .expect("permissions should be set");

        let dest = temp.path().join("copy.sh");
        copy_entry(&src, &dest).expect("file should be copied");

        let mode = std::fs::metadata(&dest)
            .expect("copy should exist")
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn remove_entry_handles_files_and_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir_all(temp.path().join("dir/nested")).expect("dirs should be created");
        std::fs::write(temp.path().join("file.txt"), "x").expect("file should be written");

        remove_entry(&temp.path().join("dir")).expect("directory should be removed");
        remove_entry(&temp.path().join("file.txt")).expect("file should be removed");

        let remaining = top_level_entries(temp.path()).expect("entries should be listed");
        assert!(remaining.is_empty());
    }
}
