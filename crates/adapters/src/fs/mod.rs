// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem abstraction shared by both ends of a transfer.
//!
//! The planner and executor only ever see `dyn FileSystem`. Upload pairs a
//! [`LocalFs`] source with an [`SftpFs`] destination; download swaps them.
//!
//! All methods are blocking. Async callers run them on the blocking pool.

mod local;
mod sftp;

pub use local::LocalFs;
pub use sftp::SftpFs;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use pvcsync_core::ItemKind;

/// One entry produced by [`FileSystem::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub kind: ItemKind,
    /// Permission bits (`0o7777` mask), when known
    pub mode: Option<u32>,
}

/// Blocking filesystem operations needed by the sync engine.
pub trait FileSystem: Send + Sync {
    /// Kind of the entry at `path`, or `None` if nothing exists there.
    ///
    /// Entries that are neither directories nor regular files report as files.
    fn stat(&self, path: &Path) -> io::Result<Option<ItemKind>>;

    /// Depth-first, pre-order walk starting with `root` itself.
    ///
    /// Siblings are yielded in name order. Symlinks and special files are
    /// skipped and never followed.
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Create or truncate a file for writing. The parent must exist.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Create `path` and any missing parents. Existing directories are fine.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Mask applied to permission bits copied between filesystems.
pub(crate) const MODE_MASK: u32 = 0o7777;
