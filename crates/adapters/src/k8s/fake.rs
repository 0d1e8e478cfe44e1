// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cluster for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Node, NodeAddress, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, NodeStatus,
    PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimStatus, PersistentVolumeClaimVolumeSource, PersistentVolumeSpec, Pod,
    PodSpec, PodStatus, Service, Volume, VolumeNodeAffinity,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use parking_lot::Mutex;

use super::{ClusterApi, ClusterError};

/// Recorded cluster call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    ListPods { namespace: String },
    GetPod { name: String },
    CreatePod { name: String },
    DeletePod { name: String },
    GetPvc { name: String },
    GetPv { name: String },
    GetNode { name: String },
    CreateService { name: String },
    GetService { name: String },
    DeleteService { name: String },
}

impl ClusterCall {
    /// Operation name used for failure injection (`"create_service"`, ...).
    pub fn op(&self) -> &'static str {
        match self {
            ClusterCall::ListPods { .. } => "list_pods",
            ClusterCall::GetPod { .. } => "get_pod",
            ClusterCall::CreatePod { .. } => "create_pod",
            ClusterCall::DeletePod { .. } => "delete_pod",
            ClusterCall::GetPvc { .. } => "get_pvc",
            ClusterCall::GetPv { .. } => "get_pv",
            ClusterCall::GetNode { .. } => "get_node",
            ClusterCall::CreateService { .. } => "create_service",
            ClusterCall::GetService { .. } => "get_service",
            ClusterCall::DeleteService { .. } => "delete_service",
        }
    }
}

struct FakeClusterState {
    pods: BTreeMap<String, Pod>,
    services: BTreeMap<String, Service>,
    pvcs: BTreeMap<String, PersistentVolumeClaim>,
    pvs: BTreeMap<String, PersistentVolume>,
    nodes: BTreeMap<String, Node>,
    calls: Vec<ClusterCall>,
    failures: HashMap<&'static str, ClusterError>,
    /// Phase reported for pods created through the fake
    pod_phase: String,
    /// nodePort assigned to created services
    node_port: Option<i32>,
    /// Whether the create response already carries the assigned nodePort
    echo_node_port: bool,
}

/// Fake cluster for testing.
///
/// Created pods report `Running` immediately and created services get
/// nodePort 30022 unless configured otherwise.
#[derive(Clone)]
pub struct FakeCluster {
    inner: Arc<Mutex<FakeClusterState>>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClusterState {
                pods: BTreeMap::new(),
                services: BTreeMap::new(),
                pvcs: BTreeMap::new(),
                pvs: BTreeMap::new(),
                nodes: BTreeMap::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                pod_phase: "Running".to_string(),
                node_port: Some(30022),
                echo_node_port: true,
            })),
        }
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.inner.lock().calls.clone()
    }

    /// Make every subsequent call of `op` fail with `error`.
    pub fn fail(&self, op: &'static str, error: ClusterError) {
        self.inner.lock().failures.insert(op, error);
    }

    pub fn set_pod_phase(&self, phase: &str) {
        self.inner.lock().pod_phase = phase.to_string();
    }

    pub fn set_node_port(&self, port: Option<i32>) {
        self.inner.lock().node_port = port;
    }

    /// Leave nodePort out of the create response so callers must re-fetch.
    pub fn hide_node_port_on_create(&self) {
        self.inner.lock().echo_node_port = false;
    }

    /// Names of pods currently present in any namespace
    pub fn pod_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .pods
            .values()
            .filter_map(|p| p.metadata.name.clone())
            .collect()
    }

    /// Names of services currently present in any namespace
    pub fn service_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .services
            .values()
            .filter_map(|s| s.metadata.name.clone())
            .collect()
    }

    /// A pod created through the fake, by name.
    pub fn pod(&self, name: &str) -> Option<Pod> {
        self.inner
            .lock()
            .pods
            .values()
            .find(|p| p.metadata.name.as_deref() == Some(name))
            .cloned()
    }

    /// A service created through the fake, by name.
    pub fn service(&self, name: &str) -> Option<Service> {
        self.inner
            .lock()
            .services
            .values()
            .find(|s| s.metadata.name.as_deref() == Some(name))
            .cloned()
    }

    /// Seed a scheduled pod that mounts `pvc`.
    pub fn add_mounting_pod(&self, namespace: &str, name: &str, pvc: &str, node: &str) {
        let pod = Pod {
            metadata: meta(Some(namespace), name),
            spec: Some(PodSpec {
                node_name: Some(node.to_string()),
                volumes: Some(vec![Volume {
                    name: "data".to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: pvc.to_string(),
                        read_only: None,
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
        };
        self.inner.lock().pods.insert(key(namespace, name), pod);
    }

    /// Seed a claim; `volume` of `None` leaves it `Pending`.
    pub fn add_pvc(&self, namespace: &str, name: &str, volume: Option<&str>) {
        let phase = if volume.is_some() { "Bound" } else { "Pending" };
        let pvc = PersistentVolumeClaim {
            metadata: meta(Some(namespace), name),
            spec: Some(PersistentVolumeClaimSpec {
                volume_name: volume.map(str::to_string),
                ..Default::default()
            }),
            status: Some(PersistentVolumeClaimStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        };
        self.inner.lock().pvcs.insert(key(namespace, name), pvc);
    }

    /// Seed a volume with a required hostname affinity (`None` for no affinity).
    pub fn add_pv(&self, name: &str, hostname: Option<&str>) {
        let node_affinity = hostname.map(|host| VolumeNodeAffinity {
            required: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: Some(vec![NodeSelectorRequirement {
                        key: "kubernetes.io/hostname".to_string(),
                        operator: "In".to_string(),
                        values: Some(vec![host.to_string()]),
                    }]),
                    match_fields: None,
                }],
            }),
        });
        let pv = PersistentVolume {
            metadata: meta(None, name),
            spec: Some(PersistentVolumeSpec {
                node_affinity,
                ..Default::default()
            }),
            status: None,
        };
        self.inner.lock().pvs.insert(name.to_string(), pv);
    }

    /// Seed a node with `(type, address)` pairs.
    pub fn add_node(&self, name: &str, addresses: &[(&str, &str)]) {
        let node = Node {
            metadata: meta(None, name),
            spec: None,
            status: Some(NodeStatus {
                addresses: Some(
                    addresses
                        .iter()
                        .map(|(ty, addr)| NodeAddress {
                            type_: ty.to_string(),
                            address: addr.to_string(),
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
        };
        self.inner.lock().nodes.insert(name.to_string(), node);
    }

    /// Record `call` and return the injected failure for its op, if any.
    fn record(&self, call: ClusterCall) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock();
        let failure = inner.failures.get(call.op()).cloned();
        inner.calls.push(call);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn not_found(kind: &'static str, name: &str) -> ClusterError {
    ClusterError::NotFound {
        kind,
        name: name.to_string(),
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        self.record(ClusterCall::ListPods {
            namespace: namespace.to_string(),
        })?;
        let prefix = format!("{}/", namespace);
        let inner = self.inner.lock();
        Ok(inner
            .pods
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError> {
        self.record(ClusterCall::GetPod {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .pods
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("pod", name))
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ClusterError> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        self.record(ClusterCall::CreatePod { name: name.clone() })?;
        let mut inner = self.inner.lock();
        let k = key(namespace, &name);
        if inner.pods.contains_key(&k) {
            return Err(ClusterError::Api {
                kind: "pod",
                message: format!("{} already exists", name),
            });
        }
        let mut created = pod.clone();
        created.status = Some(PodStatus {
            phase: Some(inner.pod_phase.clone()),
            ..Default::default()
        });
        inner.pods.insert(k, created.clone());
        Ok(created)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.record(ClusterCall::DeletePod {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .pods
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found("pod", name))
    }

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        self.record(ClusterCall::GetPvc {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .pvcs
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("persistentvolumeclaim", name))
    }

    async fn get_pv(&self, name: &str) -> Result<PersistentVolume, ClusterError> {
        self.record(ClusterCall::GetPv {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .pvs
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("persistentvolume", name))
    }

    async fn get_node(&self, name: &str) -> Result<Node, ClusterError> {
        self.record(ClusterCall::GetNode {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("node", name))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.record(ClusterCall::CreateService { name: name.clone() })?;
        let mut inner = self.inner.lock();
        let k = key(namespace, &name);
        if inner.services.contains_key(&k) {
            return Err(ClusterError::Api {
                kind: "service",
                message: format!("{} already exists", name),
            });
        }
        let mut stored = service.clone();
        let node_port = inner.node_port;
        if let Some(spec) = stored.spec.as_mut() {
            for port in spec.ports.iter_mut().flatten() {
                port.node_port = node_port;
            }
        }
        inner.services.insert(k, stored.clone());
        Ok(if inner.echo_node_port {
            stored
        } else {
            service.clone()
        })
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        self.record(ClusterCall::GetService {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .services
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("service", name))
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.record(ClusterCall::DeleteService {
            name: name.to_string(),
        })?;
        self.inner
            .lock()
            .services
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found("service", name))
    }
}
