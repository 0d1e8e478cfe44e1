// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn help_lists_both_directions() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("upload")
        .stdout_has("download");
}

#[test]
fn upload_help_shows_upload_only_flags() {
    cli()
        .args(&["upload", "--help"])
        .passes()
        .stdout_has("--pvc")
        .stdout_has("--mount-path")
        .stdout_has("--allow-overwrite")
        .stdout_has("--owner")
        .stdout_has("--workers");
}

#[test]
fn download_help_has_no_overwrite_flag() {
    let out = cli()
        .args(&["download", "--help"])
        .passes()
        .stdout_has("--dst");
    assert!(!out.stdout.contains("--allow-overwrite"));
}

#[test]
fn version_shows_version() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_has("pvcsync 0.2");
}

#[test]
fn no_args_is_a_usage_error() {
    cli().exits_with(2).stderr_has("Usage:");
}
