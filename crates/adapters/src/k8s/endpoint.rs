// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped lifecycle of the helper pod + NodePort service.
//!
//! [`with_endpoint`] is the only way to obtain a [`HelperEndpoint`]. It
//! creates the pair, hands the endpoint to a job future, and deletes both
//! objects on every exit path: success, error, cancellation and panic.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use pvcsync_core::{HelperState, NodeBinding};
use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::pod::{self, PodParams};
use super::resolve::{resolve_node, ResolveError};
use super::service;
use super::{ClusterApi, ClusterError};

const NAME_SUFFIX_LEN: usize = 7;

/// Knobs for the helper endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub image: String,
    pub name_prefix: String,
    /// Port sshd listens on inside the container
    pub ssh_port: i32,
    /// Hard pod lifetime in case teardown never runs
    pub active_deadline_secs: i64,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    /// Budget for each deletion, independent of job cancellation
    pub cleanup_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            image: "alpine:3.20".to_string(),
            name_prefix: "pvcsync".to_string(),
            ssh_port: 2222,
            active_deadline_secs: 43_200,
            poll_interval: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(300),
            cleanup_timeout: Duration::from_secs(30),
        }
    }
}

impl EndpointConfig {
    pvcsync_core::setters! {
        into {
            image: String,
            name_prefix: String,
        }
        set {
            ssh_port: i32,
            active_deadline_secs: i64,
            poll_interval: Duration,
            ready_timeout: Duration,
            cleanup_timeout: Duration,
        }
    }
}

/// What to mount and who may log in.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub pvc: String,
    pub namespace: String,
    pub mount_path: String,
    pub authorized_key: String,
}

/// A running helper endpoint, valid only inside [`with_endpoint`].
#[derive(Debug, Clone)]
pub struct HelperEndpoint {
    pub name: String,
    pub namespace: String,
    pub node: NodeBinding,
    pub mount_path: String,
    /// Service nodePort reachable on `node.address`
    pub port: u16,
}

impl HelperEndpoint {
    pub fn host(&self) -> &str {
        &self.node.address
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to create {kind}: {source}")]
    Create {
        kind: &'static str,
        source: ClusterError,
    },
    #[error("helper pod {name} terminated with phase {phase}")]
    PodTerminated { name: String, phase: String },
    #[error("helper pod {name} not running after {waited_secs}s")]
    Timeout { name: String, waited_secs: u64 },
    #[error("service {name} has no nodePort assigned")]
    NoNodePort { name: String },
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Objects that exist and must be deleted.
#[derive(Debug, Default, Clone, Copy)]
struct Created {
    pod: bool,
    service: bool,
}

/// Stand up a helper endpoint for `request`, run `job` against it, then
/// tear it down.
///
/// Resolution failures return before anything is created. A failure while
/// creating deletes whatever already exists and returns the original
/// error. A panic inside `job` is resumed after teardown.
pub async fn with_endpoint<T, E, F, Fut>(
    cluster: &dyn ClusterApi,
    config: &EndpointConfig,
    request: &EndpointRequest,
    cancel: &CancellationToken,
    job: F,
) -> Result<T, E>
where
    F: FnOnce(HelperEndpoint) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<EndpointError>,
{
    let node = resolve_node(cluster, &request.pvc, &request.namespace)
        .await
        .map_err(EndpointError::from)?;
    let name = helper_name(&config.name_prefix);

    let mut created = Created::default();
    let provisioned = provision(cluster, config, request, node, &name, cancel, &mut created).await;
    let endpoint = match provisioned {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!(helper = %name, error = %e, "helper endpoint setup failed");
            teardown(cluster, config, &request.namespace, &name, created).await;
            return Err(e.into());
        }
    };

    let result = AssertUnwindSafe(job(endpoint)).catch_unwind().await;
    teardown(cluster, config, &request.namespace, &name, created).await;
    match result {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn helper_name(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    format!("{}-{}", prefix, suffix)
}

async fn provision(
    cluster: &dyn ClusterApi,
    config: &EndpointConfig,
    request: &EndpointRequest,
    node: NodeBinding,
    name: &str,
    cancel: &CancellationToken,
    created: &mut Created,
) -> Result<HelperEndpoint, EndpointError> {
    let namespace = request.namespace.as_str();
    let params = PodParams {
        pod_name: name.to_string(),
        namespace: namespace.to_string(),
        image: config.image.clone(),
        node_name: node.node_name.clone(),
        pvc: request.pvc.clone(),
        mount_path: request.mount_path.clone(),
        authorized_key: request.authorized_key.clone(),
        ssh_port: config.ssh_port,
        active_deadline_secs: config.active_deadline_secs,
    };

    tracing::info!(
        helper = %name,
        %namespace,
        node = %node.node_name,
        image = %config.image,
        state = %HelperState::Creating,
        "creating helper pod"
    );
    cluster
        .create_pod(namespace, &pod::build_pod(&params))
        .await
        .map_err(|source| EndpointError::Create {
            kind: "pod",
            source,
        })?;
    created.pod = true;

    wait_running(cluster, config, namespace, name, cancel).await?;

    let svc = service::build_service(name, namespace, config.ssh_port);
    let svc = cluster
        .create_service(namespace, &svc)
        .await
        .map_err(|source| EndpointError::Create {
            kind: "service",
            source,
        })?;
    created.service = true;

    let port = match service::node_port(&svc) {
        Some(port) => port,
        None => {
            let svc = cluster.get_service(namespace, name).await?;
            service::node_port(&svc).ok_or_else(|| EndpointError::NoNodePort {
                name: name.to_string(),
            })?
        }
    };

    tracing::info!(
        helper = %name,
        host = %node.address,
        port,
        state = %HelperState::Running,
        "helper endpoint ready"
    );
    Ok(HelperEndpoint {
        name: name.to_string(),
        namespace: namespace.to_string(),
        node,
        mount_path: request.mount_path.clone(),
        port,
    })
}

async fn wait_running(
    cluster: &dyn ClusterApi,
    config: &EndpointConfig,
    namespace: &str,
    name: &str,
    cancel: &CancellationToken,
) -> Result<(), EndpointError> {
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(EndpointError::Cancelled);
        }
        let pod = cluster.get_pod(namespace, name).await?;
        let phase = pod.status.and_then(|s| s.phase).unwrap_or_default();
        match phase.as_str() {
            "Running" => return Ok(()),
            "Failed" | "Succeeded" => {
                return Err(EndpointError::PodTerminated {
                    name: name.to_string(),
                    phase,
                });
            }
            _ => tracing::debug!(helper = %name, %phase, "waiting for helper pod"),
        }

        if start.elapsed() >= config.ready_timeout {
            return Err(EndpointError::Timeout {
                name: name.to_string(),
                waited_secs: start.elapsed().as_secs(),
            });
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(EndpointError::Cancelled),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}

/// Delete the service, then the pod. Never fails; problems are logged.
async fn teardown(
    cluster: &dyn ClusterApi,
    config: &EndpointConfig,
    namespace: &str,
    name: &str,
    created: Created,
) {
    if !created.pod && !created.service {
        return;
    }
    tracing::info!(helper = %name, state = %HelperState::Deleting, "tearing down helper endpoint");

    let mut clean = true;
    if created.service {
        clean &= delete_quietly(
            "service",
            name,
            config.cleanup_timeout,
            cluster.delete_service(namespace, name),
        )
        .await;
    }
    if created.pod {
        clean &= delete_quietly(
            "pod",
            name,
            config.cleanup_timeout,
            cluster.delete_pod(namespace, name),
        )
        .await;
    }

    if clean {
        tracing::info!(helper = %name, state = %HelperState::Deleted, "helper endpoint removed");
    }
}

async fn delete_quietly(
    kind: &str,
    name: &str,
    timeout: Duration,
    delete: impl Future<Output = Result<(), ClusterError>>,
) -> bool {
    match tokio::time::timeout(timeout, delete).await {
        Ok(Ok(())) => {
            tracing::debug!(%kind, %name, "deleted");
            true
        }
        Ok(Err(e)) if e.is_not_found() => {
            tracing::debug!(%kind, %name, "already gone");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(%kind, %name, error = %e, "failed to delete helper object");
            false
        }
        Err(_) => {
            tracing::warn!(
                %kind,
                %name,
                timeout_secs = timeout.as_secs(),
                "timed out deleting helper object"
            );
            false
        }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
