// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument and local input validation, all exit code 2.

use crate::prelude::*;

fn upload(dir: &TempDir, extra: &[&str]) -> Vec<String> {
    let src = dir.path().join("site");
    let mut args: Vec<String> =
        ["upload", "--pvc", "data", "--mount-path", "/mnt/data", "--dst", "www"]
            .iter()
            .map(|s| s.to_string())
            .collect();
    args.push("--src".to_string());
    args.push(src.display().to_string());
    args.extend(extra.iter().map(|s| s.to_string()));
    args
}

fn refs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

#[test]
fn missing_required_flag() {
    cli()
        .args(&["upload", "--pvc", "data", "--src", "site"])
        .exits_with(2)
        .stderr_has("--mount-path");
}

#[test]
fn positional_paths_are_rejected() {
    let args = ["download", "--pvc", "data", "--mount-path", "/mnt", "a"];
    cli().args(&args).exits_with(2);
}

#[test]
fn workers_must_be_a_number() {
    let dir = TempDir::new().unwrap();
    let args = upload(&dir, &["--workers", "many"]);
    cli()
        .args(&refs(&args))
        .exits_with(2)
        .stderr_has("--workers");
}

#[test]
fn unknown_output_format() {
    let dir = TempDir::new().unwrap();
    let args = upload(&dir, &["-o", "yaml"]);
    cli().args(&refs(&args)).exits_with(2);
}

#[test]
fn missing_local_source() {
    let dir = TempDir::new().unwrap();
    let args = upload(&dir, &[]);
    cli()
        .args(&refs(&args))
        .exits_with(2)
        .stderr_has("error: invalid source");
}

#[test]
fn relative_mount_path() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("site")).unwrap();
    let mut args = upload(&dir, &[]);
    args[4] = "mnt/data".to_string();
    cli()
        .args(&refs(&args))
        .exits_with(2)
        .stderr_has("--mount-path must be absolute");
}

#[test]
fn unreachable_cluster_config_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("site")).unwrap();
    let args = upload(&dir, &[]);
    cli()
        .env("HOME", &dir.path().display().to_string())
        .args(&refs(&args))
        .exits_with(2)
        .stderr_has("cannot build cluster client");
}
