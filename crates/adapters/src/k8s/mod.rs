// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes adapter: node resolution and the helper endpoint lifecycle.
//!
//! # Module layout
//!
//! - [`resolve`]: PVC → node binding (pod fast path, PV affinity fallback)
//! - [`pod`]: helper Pod spec construction
//! - [`service`]: NodePort Service spec construction
//! - [`endpoint`]: scoped pod + service lifecycle with guaranteed teardown
//!
//! # Architecture
//!
//! All cluster access goes through [`ClusterApi`], a thin async surface over
//! the handful of typed API calls the tool needs. [`KubeCluster`] implements
//! it with `kube-rs`; `FakeCluster` implements it in memory for tests.

mod endpoint;
mod pod;
mod resolve;
mod service;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use endpoint::{with_endpoint, EndpointConfig, EndpointError, EndpointRequest, HelperEndpoint};
pub use resolve::{resolve_node, ResolveError};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClusterCall, FakeCluster};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolume, PersistentVolumeClaim, Pod, Service};
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use thiserror::Error;

/// Errors from the cluster API
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} API call failed: {message}")]
    Api { kind: &'static str, message: String },
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

/// The cluster operations needed to resolve a node and run a helper endpoint.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError>;
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError>;
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ClusterError>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ClusterError>;
    async fn get_pv(&self, name: &str) -> Result<PersistentVolume, ClusterError>;
    async fn get_node(&self, name: &str) -> Result<Node, ClusterError>;

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError>;
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError>;
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using the local kubeconfig or the in-cluster service account.
    pub async fn new() -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Api {
                kind: "client",
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn map_err(kind: &'static str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => ClusterError::Api {
            kind,
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        let list = self
            .pods(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| map_err("pod", namespace, e))?;
        Ok(list.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError> {
        self.pods(namespace)
            .get(name)
            .await
            .map_err(|e| map_err("pod", name, e))
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ClusterError> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        self.pods(namespace)
            .create(&PostParams::default(), pod)
            .await
            .map_err(|e| map_err("pod", &name, e))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_err("pod", name, e))
    }

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        pvcs.get(name)
            .await
            .map_err(|e| map_err("persistentvolumeclaim", name, e))
    }

    async fn get_pv(&self, name: &str) -> Result<PersistentVolume, ClusterError> {
        let pvs: Api<PersistentVolume> = Api::all(self.client.clone());
        pvs.get(name)
            .await
            .map_err(|e| map_err("persistentvolume", name, e))
    }

    async fn get_node(&self, name: &str) -> Result<Node, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        nodes.get(name).await.map_err(|e| map_err("node", name, e))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.services(namespace)
            .create(&PostParams::default(), service)
            .await
            .map_err(|e| map_err("service", &name, e))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        self.services(namespace)
            .get(name)
            .await
            .map_err(|e| map_err("service", name, e))
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.services(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_err("service", name, e))
    }
}
