// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pvcsync-engine: differential planning, concurrent transfer, and the job
//! pipeline tying them to the helper endpoint.

pub mod executor;
pub mod job;
pub mod plan;

pub use executor::{execute, ERROR_SLOTS};
pub use job::{remote_path, run, sync_trees, JobError, JobReport, JobSpec};
pub use plan::{plan, PlanError, PlanRequest};

#[cfg(test)]
mod test_fs;
