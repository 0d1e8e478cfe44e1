// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

/// A job ran and failed.
pub const JOB_FAILED: u8 = 1;
/// Bad flags, bad local input, or no usable cluster client.
pub const USAGE: u8 = 2;
/// The job was interrupted with Ctrl-C.
pub const INTERRUPTED: u8 = 130;

#[derive(Debug)]
pub struct ExitError {
    pub code: u8,
    pub message: String,
}

impl ExitError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }

    pub fn job_failed(message: impl Into<String>) -> Self {
        Self::new(JOB_FAILED, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code for an error returned by a command handler.
pub fn code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ExitError>()
        .map_or(JOB_FAILED, |e| e.code)
}
