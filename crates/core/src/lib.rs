// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pvcsync-core: data model shared by the pvcsync adapters, engine and CLI

pub mod macros;

pub mod digest;
pub mod direction;
pub mod helper;
pub mod item;
pub mod outcome;

pub use digest::Digest;
pub use direction::{Direction, OverwritePolicy};
pub use helper::{HelperState, NodeBinding};
pub use item::{ItemKind, WorkItem};
pub use outcome::{ItemError, TransferOutcome};
