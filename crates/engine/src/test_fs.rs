// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem fixtures shared by the planner, executor and job tests.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pvcsync_adapters::{FileSystem, LocalFs, WalkEntry};
use pvcsync_core::ItemKind;

/// Build a tree under `root`. Entries ending in `/` are directories.
pub(crate) fn tree(root: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (path, contents) in entries {
        let full = root.join(path.trim_end_matches('/'));
        if path.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, contents).unwrap();
        }
    }
}

/// Relative paths of every entry under `root`, directories suffixed with `/`.
pub(crate) fn listing(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for entry in LocalFs::new().walk(root).unwrap() {
        let rel = entry
            .path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .to_string();
        if rel.is_empty() {
            continue;
        }
        match entry.kind {
            ItemKind::Directory => out.push(format!("{}/", rel)),
            ItemKind::File => out.push(rel),
        }
    }
    out
}

/// Local filesystem with injectable failures.
#[derive(Default)]
pub(crate) struct FaultyFs {
    inner: LocalFs,
    stat_error: Option<io::ErrorKind>,
    /// File names whose `create` fails
    create_failures: Mutex<Vec<String>>,
}

impl FaultyFs {
    pub(crate) fn failing_stat(kind: io::ErrorKind) -> Self {
        Self {
            stat_error: Some(kind),
            ..Default::default()
        }
    }

    pub(crate) fn failing_create(names: &[&str]) -> Self {
        Self {
            create_failures: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        }
    }
}

impl FileSystem for FaultyFs {
    fn stat(&self, path: &Path) -> io::Result<Option<ItemKind>> {
        match self.stat_error {
            Some(kind) => Err(io::Error::new(kind, "injected stat failure")),
            None => self.inner.stat(path),
        }
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        self.inner.walk(root)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        self.inner.open_read(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.create_failures.lock().contains(&name) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected create failure",
            ));
        }
        self.inner.create(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.set_mode(path, mode)
    }
}

/// Source filesystem that tracks how many files are being read at once.
#[derive(Default)]
pub(crate) struct ConcurrencyGauge {
    inner: LocalFs,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    completed: Arc<Mutex<Vec<PathBuf>>>,
}

impl ConcurrencyGauge {
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> Vec<PathBuf> {
        self.completed.lock().clone()
    }
}

struct GaugedReader {
    inner: Box<dyn Read + Send>,
    path: PathBuf,
    active: Arc<AtomicUsize>,
    completed: Arc<Mutex<Vec<PathBuf>>>,
}

impl Read for GaugedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        std::thread::sleep(Duration::from_millis(5));
        self.inner.read(buf)
    }
}

impl Drop for GaugedReader {
    fn drop(&mut self) {
        self.completed.lock().push(self.path.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FileSystem for ConcurrencyGauge {
    fn stat(&self, path: &Path) -> io::Result<Option<ItemKind>> {
        self.inner.stat(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        self.inner.walk(root)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let reader = self.inner.open_read(path)?;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(GaugedReader {
            inner: reader,
            path: path.to_path_buf(),
            active: self.active.clone(),
            completed: self.completed.clone(),
        }))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        self.inner.create(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.set_mode(path, mode)
    }
}
