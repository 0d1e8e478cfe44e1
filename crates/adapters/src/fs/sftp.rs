// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote filesystem over the helper's SFTP subsystem.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use pvcsync_core::ItemKind;
use ssh2::{ErrorCode, FileStat, Sftp};

use super::{FileSystem, WalkEntry, MODE_MASK};
use crate::ssh::{SshSession, TransportError};

// SSH_FX_* status codes (draft-ietf-secsh-filexfer-02)
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

const DIR_MODE: i32 = 0o755;

/// SFTP-backed filesystem shared by every transfer worker.
///
/// The handle lock is held only while a request is issued; open files are
/// independent of it and stream through libssh2's own session lock.
pub struct SftpFs {
    sftp: Mutex<Sftp>,
}

impl SftpFs {
    /// Open the SFTP subsystem on an authenticated session.
    pub async fn open(session: &SshSession) -> Result<Self, TransportError> {
        let raw = session.raw();
        let sftp = tokio::task::spawn_blocking(move || raw.sftp())
            .await
            .map_err(|e| TransportError::Join(e.to_string()))??;
        Ok(Self::from_sftp(sftp))
    }

    pub fn from_sftp(sftp: Sftp) -> Self {
        Self {
            sftp: Mutex::new(sftp),
        }
    }
}

impl FileSystem for SftpFs {
    fn stat(&self, path: &Path) -> io::Result<Option<ItemKind>> {
        Ok(match existing_kind(&self.sftp.lock(), path)? {
            Existing::Directory => Some(ItemKind::Directory),
            Existing::Other => Some(ItemKind::File),
            Existing::Missing => None,
        })
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let sftp = self.sftp.lock();
        let root_stat = sftp.stat(root).map_err(to_io)?;
        walk_from(
            root.to_path_buf(),
            root_stat,
            |dir| sftp.readdir(dir).map_err(to_io),
            classify,
        )
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = self.sftp.lock().open(path).map_err(to_io)?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = self.sftp.lock().create(path).map_err(to_io)?;
        Ok(Box::new(file))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let sftp = self.sftp.lock();
        let missing = missing_dirs(path, |dir| existing_kind(&sftp, dir))?;
        make_dirs(
            &missing,
            |dir| sftp.mkdir(dir, DIR_MODE).map_err(to_io),
            |dir| existing_kind(&sftp, dir),
        )
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(mode & MODE_MASK),
            atime: None,
            mtime: None,
        };
        self.sftp.lock().setstat(path, stat).map_err(to_io)
    }
}

/// What a remote path currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Existing {
    Directory,
    Other,
    Missing,
}

fn existing_kind(sftp: &Sftp, path: &Path) -> io::Result<Existing> {
    match sftp.stat(path) {
        Ok(st) if st.is_dir() => Ok(Existing::Directory),
        Ok(_) => Ok(Existing::Other),
        Err(e) if is_not_found(&e) => Ok(Existing::Missing),
        Err(e) => Err(to_io(e)),
    }
}

/// Kind and permission bits of a listed entry; `None` for anything that is
/// neither a directory nor a regular file.
fn classify(stat: &FileStat) -> Option<(ItemKind, Option<u32>)> {
    let mode = stat.perm.map(|p| p & MODE_MASK);
    let file_type = stat.file_type();
    if file_type.is_dir() {
        Some((ItemKind::Directory, mode))
    } else if file_type.is_file() {
        Some((ItemKind::File, mode))
    } else {
        None
    }
}

/// Depth-first, pre-order walk with siblings in name order.
fn walk_from<S>(
    root: PathBuf,
    root_stat: S,
    mut read_dir: impl FnMut(&Path) -> io::Result<Vec<(PathBuf, S)>>,
    classify: impl Fn(&S) -> Option<(ItemKind, Option<u32>)>,
) -> io::Result<Vec<WalkEntry>> {
    let mut entries = Vec::new();
    let mut stack = vec![(root, root_stat)];
    while let Some((path, stat)) = stack.pop() {
        match classify(&stat) {
            Some((ItemKind::Directory, mode)) => {
                let mut children = read_dir(&path)?;
                // Reverse order so the stack pops siblings by ascending name
                children.sort_by(|a, b| b.0.cmp(&a.0));
                entries.push(WalkEntry {
                    path,
                    kind: ItemKind::Directory,
                    mode,
                });
                stack.extend(children);
            }
            Some((kind, mode)) => entries.push(WalkEntry { path, kind, mode }),
            None => tracing::debug!(path = %path.display(), "skipping special file"),
        }
    }
    Ok(entries)
}

/// Directories that must be created for `path` to exist, outermost first.
fn missing_dirs(
    path: &Path,
    mut kind_of: impl FnMut(&Path) -> io::Result<Existing>,
) -> io::Result<Vec<&Path>> {
    let mut missing = Vec::new();
    let mut cursor = Some(path);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() {
            break;
        }
        match kind_of(dir)? {
            Existing::Directory => break,
            Existing::Other => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", dir.display()),
                ))
            }
            Existing::Missing => {
                missing.push(dir);
                cursor = dir.parent();
            }
        }
    }
    missing.reverse();
    Ok(missing)
}

/// Create `dirs` in order. A failed mkdir is fine when the directory exists
/// afterwards, since concurrent workers race on shared parents.
fn make_dirs(
    dirs: &[&Path],
    mut mkdir: impl FnMut(&Path) -> io::Result<()>,
    mut kind_of: impl FnMut(&Path) -> io::Result<Existing>,
) -> io::Result<()> {
    for &dir in dirs {
        if let Err(e) = mkdir(dir) {
            if !matches!(kind_of(dir), Ok(Existing::Directory)) {
                return Err(e);
            }
        }
    }
    Ok(())
}

fn is_not_found(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH)
    )
}

fn to_io(err: ssh2::Error) -> io::Error {
    if is_not_found(&err) {
        io::Error::new(io::ErrorKind::NotFound, err)
    } else {
        io::Error::other(err)
    }
}

#[cfg(test)]
#[path = "sftp_tests.rs"]
mod tests;
