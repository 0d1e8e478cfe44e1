// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod spec construction for the helper endpoint.

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaimVolumeSource, Pod, PodSpec, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub(super) const APP_LABEL: &str = "app.kubernetes.io/name";
pub(super) const APP_NAME: &str = "pvcsync-helper";
/// Selector label shared by the pod and its service
pub(super) const HELPER_LABEL: &str = "pvcsync.io/helper";

const VOLUME_NAME: &str = "data";
const SSHD_CONFIG: &str = "/etc/ssh/pvcsync_sshd_config";

/// Container entrypoint.
///
/// Installs sshd when the image lacks it, authorizes the job key from
/// `SSH_PUBLIC_KEY`, then runs sshd in the foreground with key-only root
/// login and the in-process SFTP server.
const START_SCRIPT: &str = r#"set -e
if ! command -v sshd >/dev/null 2>&1; then
  if command -v apk >/dev/null 2>&1; then
    apk add --no-cache openssh-server openssh-sftp-server >/dev/null
  elif command -v apt-get >/dev/null 2>&1; then
    apt-get update -qq && apt-get install -y -qq openssh-server >/dev/null
  fi
fi
mkdir -p /root/.ssh /run/sshd
chmod 700 /root/.ssh
printf '%s\n' "$SSH_PUBLIC_KEY" > /root/.ssh/authorized_keys
chmod 600 /root/.ssh/authorized_keys
ssh-keygen -A >/dev/null
cat > "$SSHD_CONFIG" <<EOF
Port $SSH_PORT
PermitRootLogin prohibit-password
PasswordAuthentication no
KbdInteractiveAuthentication no
PubkeyAuthentication yes
AuthorizedKeysFile /root/.ssh/authorized_keys
Subsystem sftp internal-sftp
EOF
exec "$(command -v sshd)" -D -e -f "$SSHD_CONFIG"
"#;

/// Parameters for building a helper pod.
pub(super) struct PodParams {
    pub pod_name: String,
    pub namespace: String,
    pub image: String,
    pub node_name: String,
    pub pvc: String,
    pub mount_path: String,
    /// `authorized_keys` line for the job's key pair
    pub authorized_key: String,
    pub ssh_port: i32,
    pub active_deadline_secs: i64,
}

pub(super) fn helper_labels(name: &str) -> BTreeMap<String, String> {
    [
        (APP_LABEL.to_string(), APP_NAME.to_string()),
        (HELPER_LABEL.to_string(), name.to_string()),
    ]
    .into_iter()
    .collect()
}

/// Build the helper Pod: one sshd container pinned to the PVC's node.
pub(super) fn build_pod(params: &PodParams) -> Pod {
    let env = vec![
        env_var("SSH_PUBLIC_KEY", &params.authorized_key),
        env_var("SSH_PORT", &params.ssh_port.to_string()),
        env_var("SSHD_CONFIG", SSHD_CONFIG),
    ];

    let container = Container {
        name: "sshd".to_string(),
        image: Some(params.image.clone()),
        command: Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            START_SCRIPT.to_string(),
        ]),
        ports: Some(vec![ContainerPort {
            name: Some("ssh".to_string()),
            container_port: params.ssh_port,
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_NAME.to_string(),
            mount_path: params.mount_path.clone(),
            ..Default::default()
        }]),
        env: Some(env),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(params.pod_name.clone()),
            namespace: Some(params.namespace.clone()),
            labels: Some(helper_labels(&params.pod_name)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some(params.node_name.clone()),
            containers: vec![container],
            volumes: Some(vec![Volume {
                name: VOLUME_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: params.pvc.clone(),
                    read_only: Some(false),
                }),
                ..Default::default()
            }]),
            restart_policy: Some("Never".to_string()),
            active_deadline_seconds: Some(params.active_deadline_secs),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
