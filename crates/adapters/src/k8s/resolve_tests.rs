// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::k8s::{ClusterCall, FakeCluster};

const NS: &str = "default";

fn cluster_with_node(node: &str) -> FakeCluster {
    let cluster = FakeCluster::new();
    cluster.add_node(
        node,
        &[("Hostname", "node-host"), ("InternalIP", "10.0.0.7")],
    );
    cluster
}

#[tokio::test]
async fn falls_back_to_volume_hostname_affinity() {
    let cluster = cluster_with_node("node-7");
    cluster.add_pvc(NS, "data", Some("pv-data"));
    cluster.add_pv("pv-data", Some("node-7"));

    let binding = resolve_node(&cluster, "data", NS).await.unwrap();

    assert_eq!(binding, NodeBinding::new("node-7", "10.0.0.7"));
}

#[tokio::test]
async fn mounting_pod_wins_over_affinity() {
    let cluster = cluster_with_node("node-1");
    cluster.add_node("node-7", &[("InternalIP", "10.0.0.77")]);
    cluster.add_mounting_pod(NS, "web-0", "data", "node-1");
    cluster.add_pvc(NS, "data", Some("pv-data"));
    cluster.add_pv("pv-data", Some("node-7"));

    let binding = resolve_node(&cluster, "data", NS).await.unwrap();

    assert_eq!(binding.node_name, "node-1");
    let pvc_lookups = cluster
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ClusterCall::GetPvc { .. }))
        .count();
    assert_eq!(pvc_lookups, 0);
}

#[tokio::test]
async fn pods_mounting_other_claims_are_ignored() {
    let cluster = cluster_with_node("node-7");
    cluster.add_mounting_pod(NS, "web-0", "other", "node-1");
    cluster.add_pvc(NS, "data", Some("pv-data"));
    cluster.add_pv("pv-data", Some("node-7"));

    let binding = resolve_node(&cluster, "data", NS).await.unwrap();

    assert_eq!(binding.node_name, "node-7");
}

#[tokio::test]
async fn missing_claim_is_not_found() {
    let cluster = FakeCluster::new();
    let err = resolve_node(&cluster, "ghost", NS).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::PvcNotFound { ref pvc, .. } if pvc == "ghost"
    ));
}

#[tokio::test]
async fn pending_claim_is_unbound() {
    let cluster = FakeCluster::new();
    cluster.add_pvc(NS, "data", None);
    let err = resolve_node(&cluster, "data", NS).await.unwrap_err();
    assert!(matches!(err, ResolveError::Unbound { .. }));
}

#[tokio::test]
async fn volume_without_affinity_has_no_node() {
    let cluster = FakeCluster::new();
    cluster.add_pvc(NS, "data", Some("pv-data"));
    cluster.add_pv("pv-data", None);
    let err = resolve_node(&cluster, "data", NS).await.unwrap_err();
    assert!(matches!(err, ResolveError::NoNode { .. }));
}

#[tokio::test]
async fn hostname_used_when_no_internal_ip() {
    let cluster = FakeCluster::new();
    cluster.add_node("node-7", &[("Hostname", "node-7.local")]);
    cluster.add_mounting_pod(NS, "web-0", "data", "node-7");

    let binding = resolve_node(&cluster, "data", NS).await.unwrap();

    assert_eq!(binding.address, "node-7.local");
}

#[tokio::test]
async fn node_without_addresses_is_fatal() {
    let cluster = FakeCluster::new();
    cluster.add_node("node-7", &[("ExternalIP", "203.0.113.9")]);
    cluster.add_mounting_pod(NS, "web-0", "data", "node-7");

    let err = resolve_node(&cluster, "data", NS).await.unwrap_err();

    assert!(matches!(
        err,
        ResolveError::NoAddress { ref node } if node == "node-7"
    ));
}

#[tokio::test]
async fn unknown_node_is_no_address() {
    let cluster = FakeCluster::new();
    cluster.add_mounting_pod(NS, "web-0", "data", "node-9");
    let err = resolve_node(&cluster, "data", NS).await.unwrap_err();
    assert!(matches!(err, ResolveError::NoAddress { .. }));
}

#[tokio::test]
async fn pod_list_failure_propagates() {
    let cluster = FakeCluster::new();
    cluster.fail(
        "list_pods",
        ClusterError::Api {
            kind: "pod",
            message: "forbidden".to_string(),
        },
    );
    let err = resolve_node(&cluster, "data", NS).await.unwrap_err();
    assert!(matches!(err, ResolveError::Cluster(_)));
}
