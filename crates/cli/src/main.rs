// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pvcsync: copy file trees into and out of Kubernetes PersistentVolumeClaims

mod color;
mod commands;
mod env;
mod exit_error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::commands::transfer::{self, DownloadArgs, UploadArgs};
use crate::exit_error::INTERRUPTED;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "pvcsync",
    version,
    about = "Sync files into and out of Kubernetes PersistentVolumeClaims",
    styles = color::styles(),
)]
struct Cli {
    /// Log filter, e.g. `info` or `pvcsync_engine=debug` (PVCSYNC_LOG wins)
    #[arg(long, global = true, default_value = "info", value_name = "FILTER")]
    log_level: String,

    /// Output format for the job report
    #[arg(short = 'o', long, global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local directory into a PVC
    Upload(UploadArgs),
    /// Download a path from a PVC into a local directory
    Download(DownloadArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    let result = match cli.command {
        Commands::Upload(args) => transfer::upload(args, cli.output, &cancel).await,
        Commands::Download(args) => transfer::download(args, cli.output, &cancel).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if cancel.is_cancelled() {
                ExitCode::from(INTERRUPTED)
            } else {
                ExitCode::from(exit_error::code_for(&e))
            }
        }
    }
}

/// First Ctrl-C cancels the job so the helper is torn down; the second
/// exits immediately.
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("interrupted, cleaning up helper endpoint (Ctrl-C again to force exit)");
    tracing::warn!("cancellation requested");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::error!("forced exit, helper objects may be left behind");
        std::process::exit(i32::from(INTERRUPTED));
    }
}
