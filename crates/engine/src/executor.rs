// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent transfer executor.
//!
//! One producer fills a queue sized to the plan; a fixed pool of worker
//! tasks drains it. Each item runs on the blocking pool. A failed item is
//! counted and reported but never stops its siblings; only cancellation
//! ends the pool early, and then only between items.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use pvcsync_adapters::FileSystem;
use pvcsync_core::{ItemError, ItemKind, TransferOutcome, WorkItem};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Capacity of the error-detail channel. Failures beyond it are still
/// counted but their details are dropped.
pub const ERROR_SLOTS: usize = 64;

#[derive(Debug, Error)]
enum ItemFailure {
    #[error("open source: {0}")]
    Open(io::Error),
    #[error("create directory: {0}")]
    Mkdir(io::Error),
    #[error("create destination: {0}")]
    Create(io::Error),
    #[error("copy: {0}")]
    Copy(io::Error),
    #[error("set mode: {0}")]
    Mode(io::Error),
}

#[derive(Default)]
struct Counters {
    attempted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
}

/// Shared by every worker in one [`execute`] call.
struct WorkerCtx {
    queue: Mutex<mpsc::Receiver<WorkItem>>,
    source: Arc<dyn FileSystem>,
    destination: Arc<dyn FileSystem>,
    counters: Counters,
    errors: mpsc::Sender<ItemError>,
    cancel: CancellationToken,
}

/// Run `items` through `workers` concurrent workers (at least one).
pub async fn execute(
    items: Vec<WorkItem>,
    source: Arc<dyn FileSystem>,
    destination: Arc<dyn FileSystem>,
    workers: usize,
    cancel: &CancellationToken,
) -> TransferOutcome {
    let planned = items.len();
    let workers = workers.max(1);
    let (tx, rx) = mpsc::channel::<WorkItem>(planned.max(1));
    let (err_tx, mut err_rx) = mpsc::channel::<ItemError>(ERROR_SLOTS);

    let ctx = Arc::new(WorkerCtx {
        queue: Mutex::new(rx),
        source,
        destination,
        counters: Counters::default(),
        errors: err_tx,
        cancel: cancel.clone(),
    });

    tracing::info!(planned, workers, "starting transfer");
    let handles: Vec<_> = (0..workers)
        .map(|id| tokio::spawn(worker(id, Arc::clone(&ctx))))
        .collect();

    for item in items {
        if tx.send(item).await.is_err() {
            break;
        }
    }
    drop(tx);

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "transfer worker task failed");
        }
    }

    let mut errors = Vec::new();
    while let Ok(e) = err_rx.try_recv() {
        errors.push(e);
    }

    let counters = &ctx.counters;
    let attempted = counters.attempted.load(Ordering::SeqCst);
    let outcome = TransferOutcome {
        planned,
        attempted,
        completed: counters.completed.load(Ordering::SeqCst),
        failed: counters.failed.load(Ordering::SeqCst),
        bytes: counters.bytes.load(Ordering::SeqCst),
        errors,
        cancelled: cancel.is_cancelled() && attempted < planned,
    };
    tracing::info!(
        planned,
        completed = outcome.completed,
        failed = outcome.failed,
        bytes = outcome.bytes,
        cancelled = outcome.cancelled,
        "transfer finished"
    );
    outcome
}

async fn worker(id: usize, ctx: Arc<WorkerCtx>) {
    loop {
        if ctx.cancel.is_cancelled() {
            tracing::debug!(worker = id, "cancelled, stopping");
            return;
        }
        let next = ctx.queue.lock().await.recv().await;
        let Some(item) = next else { return };
        if ctx.cancel.is_cancelled() {
            tracing::debug!(worker = id, "cancelled, stopping");
            return;
        }

        ctx.counters.attempted.fetch_add(1, Ordering::SeqCst);
        let path = item.destination().to_path_buf();
        let kind = item.kind();
        let source = Arc::clone(&ctx.source);
        let destination = Arc::clone(&ctx.destination);
        let result = tokio::task::spawn_blocking(move || {
            transfer_item(source.as_ref(), destination.as_ref(), &item)
        })
        .await;

        match result {
            Ok(Ok(bytes)) => {
                ctx.counters.completed.fetch_add(1, Ordering::SeqCst);
                ctx.counters.bytes.fetch_add(bytes, Ordering::SeqCst);
                tracing::debug!(worker = id, %kind, path = %path.display(), bytes, "transferred");
            }
            Ok(Err(e)) => report_failure(&ctx, id, path, e.to_string()),
            Err(e) => report_failure(&ctx, id, path, format!("transfer task failed: {}", e)),
        }
    }
}

fn report_failure(ctx: &WorkerCtx, id: usize, path: PathBuf, message: String) {
    ctx.counters.failed.fetch_add(1, Ordering::SeqCst);
    tracing::error!(worker = id, path = %path.display(), error = %message, "transfer failed");
    match ctx.errors.try_send(ItemError::new(path, message)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => tracing::debug!("error detail dropped, slots full"),
        Err(TrySendError::Closed(_)) => {}
    }
}

/// Copy one item; returns the number of bytes written.
fn transfer_item(
    source: &dyn FileSystem,
    destination: &dyn FileSystem,
    item: &WorkItem,
) -> Result<u64, ItemFailure> {
    match item.kind() {
        ItemKind::Directory => {
            destination
                .create_dir_all(item.destination())
                .map_err(ItemFailure::Mkdir)?;
            Ok(0)
        }
        ItemKind::File => {
            let mut reader = source.open_read(item.source()).map_err(ItemFailure::Open)?;
            if let Some(parent) = item.destination().parent() {
                if !parent.as_os_str().is_empty() {
                    destination
                        .create_dir_all(parent)
                        .map_err(ItemFailure::Mkdir)?;
                }
            }
            let mut writer = destination
                .create(item.destination())
                .map_err(ItemFailure::Create)?;
            let bytes = io::copy(&mut reader, &mut writer).map_err(ItemFailure::Copy)?;
            writer.flush().map_err(ItemFailure::Copy)?;
            drop(writer);
            if let Some(mode) = item.mode() {
                destination
                    .set_mode(item.destination(), mode)
                    .map_err(ItemFailure::Mode)?;
            }
            Ok(bytes)
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
