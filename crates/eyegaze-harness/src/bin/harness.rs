//! CLI entrypoint for the eye-gaze layer tooling.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyegaze_harness::manifest::{loader_manifest, parse_variant};
use eyegaze_harness::{HarnessError, build_plan, check_variant, validate_trace_file};

/// Tooling for the eye-gaze OpenXR API layer.
#[derive(Debug, Parser)]
#[command(name = "eyegaze-harness")]
#[command(about = "Manifest, dispatch-plan and trace tooling for the eye-gaze API layer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a manifest variant's function and extension lists.
    Check {
        /// Variant to check (`eye-gaze` or `eye-gaze-social`).
        #[arg(long, default_value = "eye-gaze-social")]
        variant: String,
        /// Also write the loader's JSON manifest to this path.
        #[arg(long)]
        emit_manifest: Option<PathBuf>,
        /// `library_path` written into the emitted manifest.
        #[arg(long, default_value = "./eyegaze_abi.dll")]
        library_path: String,
    },
    /// Print the dispatch plan of a variant as JSON, with its SHA-256 digest.
    Plan {
        #[arg(long, default_value = "eye-gaze-social")]
        variant: String,
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a JSONL trace file written with `XR_EYEGAZE_TRACE`.
    ValidateTrace {
        /// Trace file path.
        #[arg(long)]
        trace: PathBuf,
        /// Optional output path for the JSON summary (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn write_json(value: &impl serde::Serialize, output: Option<&Path>) -> Result<(), HarnessError> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, text + "\n").map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            variant,
            emit_manifest,
            library_path,
        } => {
            let report = check_variant(parse_variant(&variant)?)?;
            eprintln!(
                "{}: {} overrides, {} requested functions",
                report.variant.as_str(),
                report.override_count,
                report.requested_count
            );
            write_json(&report, None)?;
            if let Some(path) = emit_manifest {
                write_json(&loader_manifest(&library_path), Some(&path))?;
                eprintln!("Wrote loader manifest to {}", path.display());
            }
        }
        Command::Plan { variant, output } => {
            let plan = build_plan(parse_variant(&variant)?)?;
            eprintln!(
                "{}: {} trampolines, {} pass-through, digest {}",
                plan.variant.as_str(),
                plan.trampolines,
                plan.pass_through,
                plan.digest
            );
            write_json(&plan, output.as_deref())?;
        }
        Command::ValidateTrace { trace, output } => {
            let summary = validate_trace_file(&trace)?;
            write_json(&summary, output.as_deref())?;
            for error in &summary.errors {
                eprintln!("{error}");
            }
            if !summary.is_clean() {
                return Err(HarnessError::InvalidTrace {
                    invalid: summary.lines - summary.valid,
                    lines: summary.lines,
                }
                .into());
            }
        }
    }

    Ok(())
}
