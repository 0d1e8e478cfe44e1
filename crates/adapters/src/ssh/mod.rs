// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH transport to the helper pod.
//!
//! # Module layout
//!
//! - [`keys`]: single-use Ed25519 key pair
//! - [`session`]: authenticated sessions, readiness polling, remote exec
//!
//! libssh2 is blocking; every network call here runs on tokio's blocking
//! pool so the job task can keep observing cancellation.

mod keys;
mod session;

pub use keys::KeyPair;
pub use session::{connect, wait_ready, SshSession, SSH_USER};

use thiserror::Error;

/// Errors from key generation and the SSH transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("key generation failed: {0}")]
    Key(#[from] ssh_key::Error),
    #[error("cannot resolve {addr}")]
    Resolve { addr: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ssh error: {0}")]
    Ssh(#[from] ssh2::Error),
    #[error("public key rejected by {addr}")]
    AuthRejected { addr: String },
    #[error("sshd not ready on {addr} after {waited_secs}s")]
    NotReady { addr: String, waited_secs: u64 },
    #[error("remote command `{command}` exited with status {status}: {output}")]
    Exec {
        command: String,
        status: i32,
        output: String,
    },
    #[error("cancelled")]
    Cancelled,
    #[error("blocking task failed: {0}")]
    Join(String),
}
