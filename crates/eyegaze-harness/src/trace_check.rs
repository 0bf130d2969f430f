//! Validation of trace files written by the layer.
//!
//! Each line must be a JSON object with `timestamp`, `trace_id`, `level` and
//! `event`. Optional fields are checked when present.

use std::collections::BTreeMap;
use std::path::Path;

use eyegaze_dispatch::trace::{TraceEntry, TraceLevel};
use eyegaze_dispatch::{FunctionName, LAYER_NAME};
use serde::Serialize;

use crate::error::HarnessError;

/// One problem found on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl TraceValidationError {
    fn new(line_number: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            line_number,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TraceValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate one JSONL line.
pub fn validate_trace_line(
    line: &str,
    line_number: usize,
) -> Result<TraceEntry, Vec<TraceValidationError>> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| vec![TraceValidationError::new(line_number, "<json>", format!("invalid JSON: {e}"))])?;
    let Some(obj) = value.as_object() else {
        return Err(vec![TraceValidationError::new(
            line_number,
            "<root>",
            "expected JSON object",
        )]);
    };

    let mut errors = Vec::new();
    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.get(field).is_some_and(serde_json::Value::is_string) {
            errors.push(TraceValidationError::new(
                line_number,
                field,
                "required string field missing",
            ));
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !TraceLevel::NAMES.contains(&level)
    {
        errors.push(TraceValidationError::new(
            line_number,
            "level",
            format!("invalid level: '{level}'"),
        ));
    }

    // `<layer>::<run>::<seq>`
    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str()) {
        let parts: Vec<&str> = trace_id.split("::").collect();
        if parts.len() != 3 || parts[0] != LAYER_NAME || parts[2].parse::<u64>().is_err() {
            errors.push(TraceValidationError::new(
                line_number,
                "trace_id",
                format!("expected '{LAYER_NAME}::<run>::<seq>', got '{trace_id}'"),
            ));
        }
    }

    if let Some(function) = obj.get("function")
        && !function.as_str().is_some_and(|f| FunctionName::from_name(f).is_some())
    {
        errors.push(TraceValidationError::new(
            line_number,
            "function",
            format!("not a catalogued function: {function}"),
        ));
    }

    if let Some(handle) = obj.get("handle")
        && !handle
            .as_str()
            .and_then(|h| h.strip_prefix("0x"))
            .is_some_and(|hex| u64::from_str_radix(hex, 16).is_ok())
    {
        errors.push(TraceValidationError::new(
            line_number,
            "handle",
            format!("expected a 0x-prefixed hex handle, got {handle}"),
        ));
    }

    if let Some(result) = obj.get("result")
        && !result.as_i64().is_some_and(|r| i32::try_from(r).is_ok())
    {
        errors.push(TraceValidationError::new(
            line_number,
            "result",
            format!("expected a 32-bit result code, got {result}"),
        ));
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(value)
        .map_err(|e| vec![TraceValidationError::new(line_number, "<entry>", e.to_string())])
}

/// Outcome of validating a whole file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceSummary {
    pub lines: usize,
    pub valid: usize,
    /// Valid lines per event name.
    pub events: BTreeMap<String, usize>,
    pub errors: Vec<TraceValidationError>,
}

impl TraceSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Validate every non-blank line of `text`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut summary = Self::default();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;
            match validate_trace_line(line, index + 1) {
                Ok(entry) => {
                    summary.valid += 1;
                    *summary.events.entry(entry.event).or_default() += 1;
                }
                Err(errors) => summary.errors.extend(errors),
            }
        }
        summary
    }
}

pub fn validate_trace_file(path: &Path) -> Result<TraceSummary, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    Ok(TraceSummary::from_text(&text))
}
