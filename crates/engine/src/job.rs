// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One upload or download job, end to end.
//!
//! ```text
//! keys → with_endpoint(resolve → pod → service) → wait_ready → connect
//!      → SFTP → plan → execute → [chown] → teardown
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pvcsync_adapters::ssh::{self, KeyPair, SshSession, TransportError};
use pvcsync_adapters::{
    with_endpoint, ClusterApi, EndpointConfig, EndpointError, EndpointRequest, FileSystem,
    HelperEndpoint, LocalFs, SftpFs,
};
use pvcsync_core::{Direction, OverwritePolicy, TransferOutcome};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::executor::execute;
use crate::plan::{plan, PlanError, PlanRequest};

/// Everything needed to run one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub direction: Direction,
    pub pvc: String,
    pub namespace: String,
    /// Where the PVC is mounted inside the helper pod
    pub mount_path: String,
    /// Local directory (upload) or path relative to the mount (download)
    pub source: PathBuf,
    /// Path relative to the mount (upload) or local directory (download)
    pub destination: PathBuf,
    pub workers: usize,
    pub overwrite: OverwritePolicy,
    /// `user[:group]` applied recursively after an upload
    pub owner: Option<String>,
    pub endpoint: EndpointConfig,
}

/// Summary of a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub direction: Direction,
    pub helper: String,
    pub node: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: TransferOutcome,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("invalid owner {owner:?}: expected user[:group]")]
    InvalidOwner { owner: String },
    #[error("cannot prepare local destination {}: {source}", path.display())]
    LocalDestination { path: PathBuf, source: io::Error },
    #[error("{}", transfer_summary(.outcome))]
    Transfer { outcome: TransferOutcome },
    #[error("cancelled")]
    Cancelled,
    #[error("blocking task failed: {0}")]
    Join(String),
}

fn transfer_summary(outcome: &TransferOutcome) -> String {
    let mut msg = format!("{} of {} items failed", outcome.failed, outcome.planned);
    if let Some(first) = outcome.first_error() {
        msg.push_str(&format!("; first error: {}", first));
    }
    msg
}

impl JobError {
    /// The transfer outcome, when the job got as far as transferring.
    pub fn outcome(&self) -> Option<&TransferOutcome> {
        match self {
            JobError::Transfer { outcome } => Some(outcome),
            _ => None,
        }
    }
}

/// Run `spec` against `cluster`.
///
/// The helper endpoint is always torn down before this returns, whatever
/// the outcome.
pub async fn run(
    cluster: &dyn ClusterApi,
    spec: &JobSpec,
    cancel: &CancellationToken,
) -> Result<JobReport, JobError> {
    let owner = spec.owner.as_deref().map(validate_owner).transpose()?;
    let mount = spec.mount_path.as_str();
    let (source_root, dest_root) = match spec.direction {
        Direction::Upload => (spec.source.clone(), remote_path(mount, &spec.destination)?),
        Direction::Download => {
            let local = &spec.destination;
            std::fs::create_dir_all(local).map_err(|source| JobError::LocalDestination {
                path: local.clone(),
                source,
            })?;
            (remote_path(mount, &spec.source)?, spec.destination.clone())
        }
    };
    let request = PlanRequest {
        source_root,
        dest_root,
        direction: spec.direction,
        overwrite: spec.overwrite,
    };

    let keys = Arc::new(KeyPair::generate()?);
    tracing::info!(
        direction = %spec.direction,
        pvc = %spec.pvc,
        namespace = %spec.namespace,
        fingerprint = %keys.fingerprint(),
        "starting job"
    );
    let endpoint_request = EndpointRequest {
        pvc: spec.pvc.clone(),
        namespace: spec.namespace.clone(),
        mount_path: spec.mount_path.clone(),
        authorized_key: keys.authorized_key().to_string(),
    };

    with_endpoint(cluster, &spec.endpoint, &endpoint_request, cancel, |ep| async move {
        let session = open_session(&ep, spec, keys, cancel).await?;
        let result = transfer(&session, spec, request, owner, cancel).await;
        session.close().await;
        let outcome = result?;
        Ok::<_, JobError>(JobReport {
            direction: spec.direction,
            helper: ep.name,
            node: ep.node.node_name,
            source: spec.source.clone(),
            destination: spec.destination.clone(),
            outcome,
        })
    })
    .await
}

async fn open_session(
    ep: &HelperEndpoint,
    spec: &JobSpec,
    keys: Arc<KeyPair>,
    cancel: &CancellationToken,
) -> Result<SshSession, JobError> {
    tracing::info!(host = %ep.host(), port = ep.port, "waiting for sshd");
    let timeout = spec.endpoint.ready_timeout;
    ssh::wait_ready(ep.host(), ep.port, keys.clone(), timeout, cancel).await?;
    Ok(ssh::connect(ep.host(), ep.port, keys).await?)
}

async fn transfer(
    session: &SshSession,
    spec: &JobSpec,
    request: PlanRequest,
    owner: Option<&str>,
    cancel: &CancellationToken,
) -> Result<TransferOutcome, JobError> {
    let remote: Arc<dyn FileSystem> = Arc::new(SftpFs::open(session).await?);
    let local: Arc<dyn FileSystem> = Arc::new(LocalFs::new());
    let (source, destination) = match spec.direction {
        Direction::Upload => (local, remote),
        Direction::Download => (remote, local),
    };

    let uploaded_root = request
        .source_root
        .file_name()
        .map(|base| request.dest_root.join(base));
    let outcome = sync_trees(source, destination, request, spec.workers, cancel).await?;

    if let (Direction::Upload, Some(owner), Some(root)) = (spec.direction, owner, uploaded_root) {
        let quoted = shell_quote(&root.to_string_lossy());
        let command = format!("chown -R {} {}", owner, quoted);
        tracing::info!(%owner, path = %root.display(), "changing ownership");
        session.exec(&command).await?;
    }
    Ok(outcome)
}

/// Plan and execute a transfer between two filesystems.
///
/// Fails with [`JobError::Transfer`] when any item failed and with
/// [`JobError::Cancelled`] when the token fired before all items ran.
pub async fn sync_trees(
    source: Arc<dyn FileSystem>,
    destination: Arc<dyn FileSystem>,
    request: PlanRequest,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<TransferOutcome, JobError> {
    let (src, dst, token) = (Arc::clone(&source), Arc::clone(&destination), cancel.clone());
    let items = tokio::task::spawn_blocking(move || {
        plan(src.as_ref(), dst.as_ref(), &request, &token)
    })
    .await
    .map_err(|e| JobError::Join(e.to_string()))??;

    let outcome = execute(items, source, destination, workers, cancel).await;
    if outcome.cancelled {
        return Err(JobError::Cancelled);
    }
    if !outcome.is_success() {
        return Err(JobError::Transfer { outcome });
    }
    Ok(outcome)
}

/// Resolve a user-supplied path against the helper's mount path.
///
/// Leading `/` and `.` components are ignored; `..` is rejected so the
/// result always stays under `mount_path`.
pub fn remote_path(mount_path: &str, path: &Path) -> Result<PathBuf, JobError> {
    let mount = Path::new(mount_path);
    if !mount.is_absolute() {
        return Err(JobError::InvalidPath {
            path: mount_path.to_string(),
            reason: "mount path must be absolute",
        });
    }
    let mut out = mount.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(JobError::InvalidPath {
                    path: path.display().to_string(),
                    reason: "must not escape the mount path",
                });
            }
        }
    }
    Ok(out)
}

fn validate_owner(owner: &str) -> Result<&str, JobError> {
    let valid_part = |part: &str| {
        !part.is_empty() && !part.starts_with('-') && part.chars().all(is_name_char)
    };
    let ok = match owner.split_once(':') {
        Some((user, group)) => valid_part(user) && valid_part(group),
        None => valid_part(owner),
    };
    if ok {
        Ok(owner)
    } else {
        Err(JobError::InvalidOwner {
            owner: owner.to_string(),
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
