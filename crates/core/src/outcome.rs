// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate result of one transfer job.

use std::path::PathBuf;

use serde::Serialize;

/// Failure of a single work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub path: PathBuf,
    pub message: String,
}

impl ItemError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of draining a plan through the executor.
///
/// `failed` counts every failed item; `errors` holds details for a bounded
/// subset of them, so `errors.len() <= failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    /// Items in the plan handed to the executor
    pub planned: usize,
    /// Items a worker picked up and started
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    /// Bytes copied by completed file items
    pub bytes: u64,
    pub errors: Vec<ItemError>,
    /// Workers stopped early because the job was cancelled
    pub cancelled: bool,
}

impl TransferOutcome {
    /// Outcome of a plan with nothing to do.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled && self.completed == self.planned
    }

    /// Representative error for the terminal message.
    pub fn first_error(&self) -> Option<&ItemError> {
        self.errors.first()
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
