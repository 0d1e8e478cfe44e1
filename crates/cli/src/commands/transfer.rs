// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pvcsync upload` and `pvcsync download`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use pvcsync_adapters::{EndpointConfig, KubeCluster};
use pvcsync_core::{Direction, OverwritePolicy};
use pvcsync_engine::{JobError, JobSpec};
use tokio_util::sync::CancellationToken;

use crate::env::EndpointEnv;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

/// Flags shared by both directions.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// PersistentVolumeClaim to transfer into or out of
    #[arg(long)]
    pub pvc: String,

    /// Absolute path the claim is mounted at inside the helper pod
    #[arg(long, value_name = "PATH")]
    pub mount_path: String,

    /// Source path
    #[arg(long, value_name = "PATH")]
    pub src: PathBuf,

    /// Destination path
    #[arg(long, value_name = "PATH")]
    pub dst: PathBuf,

    /// Number of concurrent transfer workers (0 runs one)
    #[arg(short = 'w', long, default_value_t = 4)]
    pub workers: usize,

    /// Namespace of the claim
    #[arg(short = 'n', long, default_value = "default")]
    pub namespace: String,

    /// Helper container image (default: PVCSYNC_IMAGE or alpine:3.20)
    #[arg(long)]
    pub image: Option<String>,

    /// Seconds to wait for the helper pod and its SSH daemon
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub ready_timeout: u64,
}

/// Copy a local directory into the claim. `--dst` is relative to the mount.
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Replace files that already exist on the claim
    #[arg(long)]
    pub allow_overwrite: bool,

    /// Recursively chown the uploaded tree to user[:group]
    #[arg(long, value_name = "USER[:GROUP]")]
    pub owner: Option<String>,
}

/// Copy a path from the claim to a local directory. `--src` is relative to
/// the mount.
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub async fn upload(
    args: UploadArgs,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = local_source(&args.target.src)?;
    let spec = JobSpec {
        source,
        overwrite: OverwritePolicy::from_flag(args.allow_overwrite),
        owner: args.owner.clone(),
        ..job_spec(Direction::Upload, &args.target, EndpointEnv::from_env())?
    };
    run(spec, format, cancel).await
}

pub async fn download(
    args: DownloadArgs,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let spec = job_spec(Direction::Download, &args.target, EndpointEnv::from_env())?;
    run(spec, format, cancel).await
}

async fn run(spec: JobSpec, format: OutputFormat, cancel: &CancellationToken) -> Result<()> {
    let cluster = KubeCluster::new()
        .await
        .map_err(|e| ExitError::usage(format!("cannot build cluster client: {}", e)))?;

    match pvcsync_engine::run(&cluster, &spec, cancel).await {
        Ok(report) => output::print_report(&report, format),
        Err(e) => {
            if let JobError::Transfer { outcome } = &e {
                output::print_failed_outcome(outcome, format)?;
            }
            Err(ExitError::job_failed(e.to_string()).into())
        }
    }
}

/// Validate flags and build the job; overwrite and owner default to off.
fn job_spec(direction: Direction, args: &TargetArgs, env: EndpointEnv) -> Result<JobSpec> {
    if !args.mount_path.starts_with('/') {
        return Err(ExitError::usage(format!(
            "--mount-path must be absolute, got {:?}",
            args.mount_path
        ))
        .into());
    }
    Ok(JobSpec {
        direction,
        pvc: args.pvc.clone(),
        namespace: args.namespace.clone(),
        mount_path: args.mount_path.clone(),
        source: args.src.clone(),
        destination: args.dst.clone(),
        workers: args.workers,
        overwrite: OverwritePolicy::Forbid,
        owner: None,
        endpoint: endpoint_config(args, env),
    })
}

/// Flags override the environment, which overrides the defaults.
fn endpoint_config(args: &TargetArgs, env: EndpointEnv) -> EndpointConfig {
    let mut config = env.apply(EndpointConfig::default());
    if let Some(image) = &args.image {
        config = config.image(image.clone());
    }
    config.ready_timeout(Duration::from_secs(args.ready_timeout))
}

/// An upload source must exist locally; its canonical form keeps the base
/// name meaningful for inputs like `.`.
fn local_source(path: &Path) -> Result<PathBuf> {
    let canonical = std::fs::canonicalize(path)
        .map_err(|e| ExitError::usage(format!("invalid source {}: {}", path.display(), e)))?;
    Ok(canonical)
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
