// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer direction and overwrite policy.

use serde::Serialize;

/// Which side of the transfer is local.
///
/// Upload and download share one planner/executor pipeline; the direction
/// only decides which filesystem plays the source and which the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local tree → PVC
    Upload,
    /// PVC → local tree
    Download,
}

crate::simple_display! {
    Direction {
        Upload => "upload",
        Download => "download",
    }
}

impl Direction {
    /// Overwrite protection is only enforced when writing into the PVC.
    pub fn enforces_overwrite_policy(self) -> bool {
        matches!(self, Direction::Upload)
    }
}

/// Whether existing destination entries may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    #[default]
    Forbid,
    Allow,
}

impl OverwritePolicy {
    pub fn from_flag(allow: bool) -> Self {
        if allow {
            OverwritePolicy::Allow
        } else {
            OverwritePolicy::Forbid
        }
    }

    pub fn allows(self) -> bool {
        matches!(self, OverwritePolicy::Allow)
    }
}
