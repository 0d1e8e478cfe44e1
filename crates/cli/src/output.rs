// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use pvcsync_core::TransferOutcome;
use pvcsync_engine::JobReport;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print the report of a finished job to stdout.
pub fn print_report(report: &JobReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

/// Print the counts of a transfer that failed part way, in JSON mode only.
///
/// Text mode relies on the error message printed by `main`.
pub fn print_failed_outcome(outcome: &TransferOutcome, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    }
    Ok(())
}

fn render_text(report: &JobReport) -> String {
    let outcome = &report.outcome;
    let mut out = format!(
        "{} {} {} {}\n",
        color::header(&format!("{} complete", report.direction)),
        report.source.display(),
        color::muted("→"),
        report.destination.display(),
    );
    if outcome.planned == 0 {
        out.push_str("  nothing to transfer, destination is up to date\n");
    } else {
        out.push_str(&format!(
            "  {} {} transferred, {}\n",
            outcome.completed,
            plural(outcome.completed, "item", "items"),
            format_bytes(outcome.bytes)
        ));
    }
    out.push_str(&color::muted(&format!("  via {} on {}", report.helper, report.node)));
    out.push('\n');
    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Human-readable byte count using binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
