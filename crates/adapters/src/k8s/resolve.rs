// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PVC → node resolution.

use k8s_openapi::api::core::v1::{Node, PersistentVolume, Pod, Volume};
use pvcsync_core::NodeBinding;
use thiserror::Error;

use super::{ClusterApi, ClusterError};

const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("persistentvolumeclaim {namespace}/{pvc} not found")]
    PvcNotFound { pvc: String, namespace: String },
    #[error("persistentvolumeclaim {pvc} is not bound to a volume")]
    Unbound { pvc: String },
    #[error("no node found for persistentvolumeclaim {pvc}")]
    NoNode { pvc: String },
    #[error("no reachable address for node {node}")]
    NoAddress { node: String },
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Find the node serving `pvc` and the address to reach it on.
///
/// A pod currently mounting the claim wins; otherwise the bound volume's
/// hostname node affinity decides.
pub async fn resolve_node(
    cluster: &dyn ClusterApi,
    pvc: &str,
    namespace: &str,
) -> Result<NodeBinding, ResolveError> {
    let node_name = match node_from_pods(cluster, pvc, namespace).await? {
        Some(node) => {
            tracing::debug!(%pvc, %node, "node resolved from mounting pod");
            node
        }
        None => {
            let node = node_from_volume(cluster, pvc, namespace).await?;
            tracing::debug!(%pvc, %node, "node resolved from volume affinity");
            node
        }
    };

    let node = match cluster.get_node(&node_name).await {
        Ok(node) => node,
        Err(e) => {
            tracing::warn!(node = %node_name, error = %e, "node lookup failed");
            return Err(ResolveError::NoAddress { node: node_name });
        }
    };
    let address = node_address(&node).ok_or_else(|| ResolveError::NoAddress {
        node: node_name.clone(),
    })?;

    tracing::info!(%pvc, node = %node_name, %address, "resolved volume placement");
    Ok(NodeBinding::new(node_name, address))
}

async fn node_from_pods(
    cluster: &dyn ClusterApi,
    pvc: &str,
    namespace: &str,
) -> Result<Option<String>, ResolveError> {
    let pods = cluster.list_pods(namespace).await?;
    Ok(pods.iter().find_map(|pod| mounting_node(pod, pvc)))
}

fn mounting_node(pod: &Pod, pvc: &str) -> Option<String> {
    let spec = pod.spec.as_ref()?;
    let node = spec.node_name.as_deref().filter(|n| !n.is_empty())?;
    let mounts_claim = spec.volumes.iter().flatten().any(|v| claims(v, pvc));
    mounts_claim.then(|| node.to_string())
}

fn claims(volume: &Volume, pvc: &str) -> bool {
    volume
        .persistent_volume_claim
        .as_ref()
        .is_some_and(|src| src.claim_name == pvc)
}

async fn node_from_volume(
    cluster: &dyn ClusterApi,
    pvc: &str,
    namespace: &str,
) -> Result<String, ResolveError> {
    let claim = cluster.get_pvc(namespace, pvc).await.map_err(|e| match e {
        ClusterError::NotFound { .. } => ResolveError::PvcNotFound {
            pvc: pvc.to_string(),
            namespace: namespace.to_string(),
        },
        other => ResolveError::Cluster(other),
    })?;

    let bound = claim.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Bound");
    let volume_name = claim
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.as_deref())
        .unwrap_or("");
    if !bound || volume_name.is_empty() {
        return Err(ResolveError::Unbound {
            pvc: pvc.to_string(),
        });
    }

    let volume = cluster.get_pv(volume_name).await?;
    hostname_affinity(&volume).ok_or_else(|| ResolveError::NoNode {
        pvc: pvc.to_string(),
    })
}

/// First value of a required `kubernetes.io/hostname In [...]` term.
fn hostname_affinity(volume: &PersistentVolume) -> Option<String> {
    let affinity = volume.spec.as_ref()?.node_affinity.as_ref()?;
    let terms = &affinity.required.as_ref()?.node_selector_terms;
    terms
        .iter()
        .flat_map(|term| term.match_expressions.iter().flatten())
        .filter(|expr| expr.key == HOSTNAME_LABEL && expr.operator == "In")
        .find_map(|expr| expr.values.as_ref().and_then(|v| v.first()).cloned())
}

/// InternalIP if present, else Hostname.
fn node_address(node: &Node) -> Option<String> {
    let addresses = node.status.as_ref()?.addresses.as_ref()?;
    let of_type = |ty: &str| {
        addresses
            .iter()
            .find(|a| a.type_ == ty && !a.address.is_empty())
            .map(|a| a.address.clone())
    };
    of_type("InternalIP").or_else(|| of_type("Hostname"))
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
