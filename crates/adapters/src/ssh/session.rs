// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated SSH sessions against the helper endpoint.
//!
//! Host keys are not verified: the helper's sshd is created for this job,
//! generates its host keys at startup and lives only as long as the job.

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ssh2::{ExtendedData, Session};
use tokio_util::sync::CancellationToken;

use super::{KeyPair, TransportError};

/// Login used inside the helper container.
pub const SSH_USER: &str = "root";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-call timeout for blocking libssh2 operations (handshake, SFTP requests, reads/writes).
const IO_TIMEOUT_MS: u32 = 60_000;
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// An authenticated session to the helper's sshd.
pub struct SshSession {
    session: Session,
    addr: String,
}

impl SshSession {
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn raw(&self) -> Session {
        self.session.clone()
    }

    /// Run `command` in the helper and return its combined stdout and stderr.
    ///
    /// The I/O timeout is lifted while the command runs, so long silent
    /// commands are waited for. A non-zero exit status is an error carrying
    /// the command's output.
    pub async fn exec(&self, command: &str) -> Result<String, TransportError> {
        let session = self.session.clone();
        let command = command.to_string();
        tokio::task::spawn_blocking(move || {
            let _untimed = TimeoutGuard::lift(&session);
            let mut channel = session.channel_session()?;
            channel.handle_extended_data(ExtendedData::Merge)?;
            channel.exec(&command)?;
            let mut output = String::new();
            channel.read_to_string(&mut output)?;
            channel.wait_close()?;
            let status = channel.exit_status()?;
            if status != 0 {
                return Err(TransportError::Exec {
                    command,
                    status,
                    output: output.trim().to_string(),
                });
            }
            Ok(output)
        })
        .await
        .map_err(|e| TransportError::Join(e.to_string()))?
    }

    pub async fn close(self) {
        let addr = self.addr.clone();
        let result = tokio::task::spawn_blocking(move || {
            self.session.disconnect(None, "pvcsync done", None)
        })
        .await;
        match result {
            Ok(Ok(())) => tracing::debug!(%addr, "ssh session closed"),
            Ok(Err(e)) => tracing::debug!(%addr, error = %e, "ssh disconnect failed"),
            Err(e) => tracing::debug!(%addr, error = %e, "ssh disconnect task failed"),
        }
    }
}

/// Clears the session's blocking timeout and restores it on drop.
struct TimeoutGuard<'a> {
    session: &'a Session,
    saved_ms: u32,
}

impl<'a> TimeoutGuard<'a> {
    fn lift(session: &'a Session) -> Self {
        let saved_ms = session.timeout();
        session.set_timeout(0);
        Self { session, saved_ms }
    }
}

impl Drop for TimeoutGuard<'_> {
    fn drop(&mut self) {
        self.session.set_timeout(self.saved_ms);
    }
}

/// Open an authenticated session as [`SSH_USER`] using the job's key pair.
pub async fn connect(
    host: &str,
    port: u16,
    keys: Arc<KeyPair>,
) -> Result<SshSession, TransportError> {
    let host = host.to_string();
    tokio::task::spawn_blocking(move || connect_blocking(&host, port, &keys))
        .await
        .map_err(|e| TransportError::Join(e.to_string()))?
}

fn connect_blocking(host: &str, port: u16, keys: &KeyPair) -> Result<SshSession, TransportError> {
    let addr = format!("{}:{}", host, port);
    let sock = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| TransportError::Resolve { addr: addr.clone() })?;
    let tcp = TcpStream::connect_timeout(&sock, CONNECT_TIMEOUT)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(IO_TIMEOUT_MS);
    session.handshake()?;
    session.userauth_pubkey_memory(
        SSH_USER,
        Some(keys.authorized_key()),
        keys.private_pem(),
        None,
    )?;
    if !session.authenticated() {
        return Err(TransportError::AuthRejected { addr });
    }
    Ok(SshSession { session, addr })
}

/// Retry until a full authenticated handshake succeeds.
///
/// Every attempt is a fresh connection; the first session that authenticates
/// is closed before returning so callers open their real session cleanly.
pub async fn wait_ready(
    host: &str,
    port: u16,
    keys: Arc<KeyPair>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), TransportError> {
    let start = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        attempt += 1;
        match connect(host, port, keys.clone()).await {
            Ok(ready) => {
                tracing::info!(addr = %ready.addr(), attempt, "sshd ready");
                ready.close().await;
                return Ok(());
            }
            Err(e) => tracing::debug!(%host, port, attempt, error = %e, "sshd not ready yet"),
        }

        if start.elapsed() >= timeout {
            return Err(TransportError::NotReady {
                addr: format!("{}:{}", host, port),
                waited_secs: start.elapsed().as_secs(),
            });
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            _ = tokio::time::sleep(RETRY_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
