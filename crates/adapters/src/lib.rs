// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the Kubernetes API, SSH/SFTP, and filesystems.

pub mod fs;
pub mod k8s;
pub mod ssh;

pub use fs::{FileSystem, LocalFs, SftpFs, WalkEntry};
pub use k8s::{
    resolve_node, with_endpoint, ClusterApi, ClusterError, EndpointConfig, EndpointError,
    EndpointRequest, HelperEndpoint, KubeCluster, ResolveError,
};
pub use ssh::{KeyPair, SshSession, TransportError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use k8s::{ClusterCall, FakeCluster};
