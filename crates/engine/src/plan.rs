// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Differential sync planner.
//!
//! Walks the source tree and decides, entry by entry, what the executor has
//! to do. Directories are always planned; files are planned unless both
//! sides hash to the same SHA-256 digest.

use std::io;
use std::path::{Path, PathBuf};

use pvcsync_adapters::{FileSystem, WalkEntry};
use pvcsync_core::{Digest, Direction, ItemKind, OverwritePolicy, WorkItem};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Where to copy from and to.
///
/// Every source entry lands at `dest_root/<basename(source_root)>/<relative path>`.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub direction: Direction,
    pub overwrite: OverwritePolicy,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("overwrite is forbidden, destination already exists: {}", path.display())]
    Conflict { path: PathBuf },
    #[error("cannot check destination {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },
    #[error("cannot walk {}: {source}", path.display())]
    Walk { path: PathBuf, source: io::Error },
    #[error("source path {} has no final component", path.display())]
    NoBaseName { path: PathBuf },
    #[error("planning cancelled")]
    Cancelled,
}

/// Build the ordered list of work items for `request`.
///
/// Blocking; callers on the async runtime run it on the blocking pool.
pub fn plan(
    source: &dyn FileSystem,
    destination: &dyn FileSystem,
    request: &PlanRequest,
    cancel: &CancellationToken,
) -> Result<Vec<WorkItem>, PlanError> {
    let base = request
        .source_root
        .file_name()
        .ok_or_else(|| PlanError::NoBaseName {
            path: request.source_root.clone(),
        })?;
    let target_root = request.dest_root.join(base);

    let entries = source
        .walk(&request.source_root)
        .map_err(|source| PlanError::Walk {
            path: request.source_root.clone(),
            source,
        })?;

    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }
        let target = mirror_path(&request.source_root, &target_root, &entry.path);

        if request.direction.enforces_overwrite_policy() {
            check_overwrite(destination, &target, entry.kind, request.overwrite)?;
        }

        match plan_entry(source, destination, entry, target) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    tracing::info!(
        direction = %request.direction,
        source = %request.source_root.display(),
        target = %target_root.display(),
        planned = items.len(),
        skipped,
        "planned transfer"
    );
    Ok(items)
}

fn mirror_path(source_root: &Path, target_root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(source_root) {
        Ok(rel) if rel.as_os_str().is_empty() => target_root.to_path_buf(),
        Ok(rel) => target_root.join(rel),
        // Walk entries always sit under the root
        Err(_) => target_root.join(path.file_name().unwrap_or_default()),
    }
}

fn check_overwrite(
    destination: &dyn FileSystem,
    target: &Path,
    kind: ItemKind,
    overwrite: OverwritePolicy,
) -> Result<(), PlanError> {
    let existing = destination
        .stat(target)
        .map_err(|source| PlanError::Stat {
            path: target.to_path_buf(),
            source,
        })?;
    if existing == Some(kind) && !overwrite.allows() {
        return Err(PlanError::Conflict {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

fn plan_entry(
    source: &dyn FileSystem,
    destination: &dyn FileSystem,
    entry: WalkEntry,
    target: PathBuf,
) -> Option<WorkItem> {
    match entry.kind {
        ItemKind::Directory => Some(WorkItem::directory(entry.path, target)),
        ItemKind::File => {
            let source_digest = digest(source, &entry.path);
            let destination_digest = digest(destination, &target);
            let item = WorkItem::file(entry.path, target, source_digest, destination_digest)
                .with_mode(entry.mode);
            if item.needs_transfer() {
                Some(item)
            } else {
                tracing::debug!(path = %item.destination().display(), "unchanged, skipping");
                None
            }
        }
    }
}

/// SHA-256 of the file at `path`; `None` when it cannot be read.
fn digest(fs: &dyn FileSystem, path: &Path) -> Option<Digest> {
    let result = fs
        .open_read(path)
        .and_then(|mut reader| Digest::from_reader(&mut reader));
    match result {
        Ok(digest) => Some(digest),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "digest unavailable");
            None
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
