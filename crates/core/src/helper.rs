// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placement and lifecycle of the helper endpoint.

use serde::Serialize;

/// Node that can serve a PVC's data, and how to reach it.
///
/// Resolved once per job and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeBinding {
    pub node_name: String,
    /// InternalIP when the node reports one, otherwise its hostname
    pub address: String,
}

impl NodeBinding {
    pub fn new(node_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            address: address.into(),
        }
    }
}

/// Lifecycle of the helper pod + service pair.
///
/// `Creating → Running → Deleting → Deleted`; a failure while creating jumps
/// straight to `Deleting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperState {
    Creating,
    Running,
    Deleting,
    Deleted,
}

crate::simple_display! {
    HelperState {
        Creating => "creating",
        Running => "running",
        Deleting => "deleting",
        Deleted => "deleted",
    }
}
