// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planned filesystem actions.

use std::path::{Path, PathBuf};

use crate::Digest;

/// Kind of filesystem entry a work item acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Directory,
    File,
}

crate::simple_display! {
    ItemKind {
        Directory => "directory",
        File => "file",
    }
}

/// One planned create-directory or copy-file action.
///
/// Built once by the planner and consumed exactly once by the executor.
/// Directory items never carry digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    source: PathBuf,
    destination: PathBuf,
    kind: ItemKind,
    source_digest: Option<Digest>,
    destination_digest: Option<Digest>,
    /// Permission bits of the source entry, when the source filesystem reports them
    mode: Option<u32>,
}

impl WorkItem {
    pub fn directory(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind: ItemKind::Directory,
            source_digest: None,
            destination_digest: None,
            mode: None,
        }
    }

    pub fn file(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        source_digest: Option<Digest>,
        destination_digest: Option<Digest>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind: ItemKind::File,
            source_digest,
            destination_digest,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ItemKind::Directory
    }

    pub fn source_digest(&self) -> Option<Digest> {
        self.source_digest
    }

    pub fn destination_digest(&self) -> Option<Digest> {
        self.destination_digest
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    /// Whether the executor has to act on this item.
    ///
    /// Directories always do. Files are skipped only when both digests are
    /// known and equal; an unknown digest on either side means "copy".
    pub fn needs_transfer(&self) -> bool {
        match self.kind {
            ItemKind::Directory => true,
            ItemKind::File => match (self.source_digest, self.destination_digest) {
                (Some(src), Some(dst)) => src != dst,
                _ => true,
            },
        }
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
