#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use mdviewer_update::{ArchiveFormat, UpdateConfig};

pub const REPOSITORY: &str = "juren53/MDviewer";

pub enum Entry<'a> {
    File(&'a str, &'a str),
    Symlink(&'a str, &'a str),
}

/// Build a gzip-compressed tarball in memory.
pub fn tarball(entries: &[Entry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::File(path, contents) => {
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                builder
                    .append_data(&mut header, path, contents.as_bytes())
                    .expect("file entry should be appended");
            }
            Entry::Symlink(path, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder
                    .append_link(&mut header, path, target)
                    .expect("symlink entry should be appended");
            }
        }
    }

    builder
        .into_inner()
        .expect("tar stream should be finalized")
        .finish()
        .expect("gzip stream should be finalized")
}

/// A release tarball wrapped in `MDviewer-<version>/`, like hosted source
/// archives.
pub fn release_tarball(version: &str) -> Vec<u8> {
    let marker = marker_content(version);
    let root = format!("MDviewer-{version}");
    tarball(&[
        Entry::File(&format!("{root}/version.py"), &marker),
        Entry::File(&format!("{root}/viewer.py"), "print('new viewer')\n"),
        Entry::File(&format!("{root}/themes/dark.css"), "body { color: white; }\n"),
        Entry::File(&format!("{root}/AGENTS.md"), "upstream notes\n"),
    ])
}

pub fn marker_content(version: &str) -> String {
    format!("\"\"\"Version information\"\"\"\n__version__ = \"{version}\"\n")
}

/// A minimal archive-style installation at `root`.
pub fn write_install(root: &Path, version: &str) {
    std::fs::create_dir_all(root.join("themes")).expect("install dirs should be created");
    std::fs::write(root.join("version.py"), marker_content(version))
        .expect("marker should be written");
    std::fs::write(root.join("viewer.py"), "print('old viewer')\n")
        .expect("viewer should be written");
    std::fs::write(root.join("themes/light.css"), "body { color: black; }\n")
        .expect("theme should be written");
    std::fs::write(root.join("AGENTS.md"), "local notes\n").expect("notes should be written");
}

pub fn config(root: &Path, server_uri: &str) -> UpdateConfig {
    UpdateConfig::new(root, REPOSITORY)
        .expect("config should build")
        .with_api_base_url(server_uri)
        .with_download_base_url(server_uri)
        .with_archive_format(ArchiveFormat::TarGz)
        .with_http_timeout(Duration::from_secs(5))
        .with_download_timeout(Duration::from_secs(5))
        .with_command_timeout(Duration::from_secs(5))
}

pub fn archive_path(version: &str) -> String {
    format!("/{REPOSITORY}/archive/refs/tags/v{version}.tar.gz")
}

pub fn releases_path() -> String {
    format!("/repos/{REPOSITORY}/releases")
}

/// Every file below `root` (excluding update bookkeeping) with its contents.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).expect("directory should be readable") {
            let path = entry.expect("entry should be readable").path();
            let relative = path
                .strip_prefix(base)
                .expect("path should be below base")
                .to_string_lossy()
                .into_owned();
            if relative == ".backups" {
                continue;
            }
            if path.is_dir() {
                walk(base, &path, files);
            } else {
                files.insert(relative, std::fs::read(&path).unwrap_or_default());
            }
        }
    }

    let mut files = BTreeMap::new();
    walk(root, root, &mut files);
    files
}

/// Write an executable shell script standing in for the git client.
#[cfg(unix)]
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-git");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("script should be written");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("script should be made executable");
    path
}
