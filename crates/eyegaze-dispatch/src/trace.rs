//! Structured JSONL trace of layer activity.
//!
//! One [`TraceEntry`] per line. Required fields: `timestamp`, `trace_id`,
//! `level`, `event`. Nothing is formatted unless a sink is installed, so
//! [`record`] costs one relaxed load on the hot path when tracing is off.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, const_mutex};
use serde::{Deserialize, Serialize};

use crate::function::FunctionName;

/// Severity of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl TraceLevel {
    pub const NAMES: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
}

/// One trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: TraceLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Handle the call was made on, as `0x...`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Raw result code returned upward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Entry with required fields only; the sink assigns the trace id.
    #[must_use]
    pub fn new(level: TraceLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: String::new(),
            level,
            event: event.into(),
            function: None,
            handle: None,
            result: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_function(mut self, function: FunctionName) -> Self {
        self.function = Some(function.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = Some(format!("{handle:#x}"));
        self
    }

    #[must_use]
    pub fn with_result(mut self, raw: i32) -> Self {
        self.result = Some(raw);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

enum Target {
    File(BufWriter<File>),
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// Destination for trace lines.
pub struct TraceSink {
    target: Target,
    run_id: String,
    seq: u64,
}

impl TraceSink {
    /// Append to `path`, creating it if needed.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            target: Target::File(BufWriter::new(file)),
            run_id: default_run_id(),
            seq: 0,
        })
    }

    /// Write into a shared buffer (for tests). Returns the buffer handle.
    #[must_use]
    pub fn to_buffer(run_id: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            target: Target::Buffer(Arc::clone(&buffer)),
            run_id: run_id.to_string(),
            seq: 0,
        };
        (sink, buffer)
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", crate::LAYER_NAME, self.run_id, self.seq)
    }

    /// Write one entry, assigning a trace id if it has none.
    pub fn emit(&mut self, mut entry: TraceEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        match &mut self.target {
            Target::File(writer) => {
                writeln!(writer, "{line}")?;
                writer.flush()
            }
            Target::Buffer(buffer) => {
                let mut buffer = buffer.lock();
                buffer.extend_from_slice(line.as_bytes());
                buffer.push(b'\n');
                Ok(())
            }
        }
    }
}

fn default_run_id() -> String {
    format!("pid{}", std::process::id())
}

static SINK: Mutex<Option<TraceSink>> = const_mutex(None);
static ENABLED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide sink, returning the previous one.
pub fn install(sink: TraceSink) -> Option<TraceSink> {
    let previous = SINK.lock().replace(sink);
    ENABLED.store(true, Ordering::Release);
    previous
}

/// Remove the process-wide sink.
pub fn uninstall() -> Option<TraceSink> {
    ENABLED.store(false, Ordering::Release);
    SINK.lock().take()
}

#[must_use]
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Emit the entry built by `make` if a sink is installed.
///
/// `make` runs before the sink lock is taken, so it may take other locks.
/// Write failures are dropped: tracing never changes a call's result.
pub fn record(make: impl FnOnce() -> TraceEntry) {
    if !enabled() {
        return;
    }
    let entry = make();
    if let Some(sink) = SINK.lock().as_mut() {
        let _ = sink.emit(entry);
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn now_utc() -> String {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(elapsed.as_secs(), elapsed.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
