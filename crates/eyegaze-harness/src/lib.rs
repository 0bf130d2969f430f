//! Offline tooling for the eye-gaze API layer.
//!
//! - [`manifest`]: validate a built-in manifest variant and emit the loader's
//!   JSON manifest for it.
//! - [`plan`]: the dispatch plan a variant produces, with a stable digest.
//! - [`trace_check`]: line-by-line validation of the layer's JSONL trace files.

#![forbid(unsafe_code)]

pub mod error;
pub mod manifest;
pub mod plan;
pub mod trace_check;

pub use error::HarnessError;
pub use manifest::{ManifestReport, check_variant};
pub use plan::{PlanReport, build_plan};
pub use trace_check::{TraceSummary, TraceValidationError, validate_trace_file, validate_trace_line};
