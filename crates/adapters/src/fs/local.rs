// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local filesystem backed by `std::fs` and `walkdir`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use pvcsync_core::ItemKind;
use walkdir::WalkDir;

use super::{FileSystem, WalkEntry, MODE_MASK};

/// The machine pvcsync runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn stat(&self, path: &Path) -> io::Result<Option<ItemKind>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Some(ItemKind::Directory)),
            Ok(_) => Ok(Some(ItemKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                ItemKind::Directory
            } else if file_type.is_file() {
                ItemKind::File
            } else {
                tracing::debug!(path = %entry.path().display(), "skipping special file");
                continue;
            };
            let mode = entry.metadata().ok().and_then(|m| permission_bits(&m));
            entries.push(WalkEntry {
                path: entry.into_path(),
                kind,
                mode,
            });
        }
        Ok(entries)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & MODE_MASK))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & MODE_MASK)
}

#[cfg(not(unix))]
fn permission_bits(_meta: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
