// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::time::Duration;

use pvcsync_adapters::EndpointConfig;

/// Log filter override; wins over `--log-level`.
pub fn log_filter() -> Option<String> {
    std::env::var("PVCSYNC_LOG").ok().filter(|s| !s.is_empty())
}

/// Endpoint settings read from `PVCSYNC_*` variables.
///
/// Unset or unparseable variables leave the default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointEnv {
    pub image: Option<String>,
    pub ssh_port: Option<i32>,
    pub deadline_secs: Option<i64>,
    pub poll_interval: Option<Duration>,
    pub cleanup_timeout: Option<Duration>,
}

impl EndpointEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<i64>().ok());
        let millis = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        Self {
            image: lookup("PVCSYNC_IMAGE").filter(|s| !s.is_empty()),
            ssh_port: parsed("PVCSYNC_SSH_PORT")
                .and_then(|p| i32::try_from(p).ok())
                .filter(|p| (1..=65535).contains(p)),
            deadline_secs: parsed("PVCSYNC_DEADLINE_SECS").filter(|s| *s > 0),
            poll_interval: millis("PVCSYNC_POLL_MS").filter(|d| !d.is_zero()),
            cleanup_timeout: millis("PVCSYNC_CLEANUP_TIMEOUT_MS").filter(|d| !d.is_zero()),
        }
    }

    pub fn apply(self, mut config: EndpointConfig) -> EndpointConfig {
        if let Some(image) = self.image {
            config = config.image(image);
        }
        if let Some(port) = self.ssh_port {
            config = config.ssh_port(port);
        }
        if let Some(secs) = self.deadline_secs {
            config = config.active_deadline_secs(secs);
        }
        if let Some(interval) = self.poll_interval {
            config = config.poll_interval(interval);
        }
        if let Some(timeout) = self.cleanup_timeout {
            config = config.cleanup_timeout(timeout);
        }
        config
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
