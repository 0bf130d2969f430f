//! Layer configuration.
//!
//! Read from the environment once per process:
//! - `XR_EYEGAZE_MODE`: `auto` (default) activates the layer only for
//!   instances that ask for eye gaze interaction; `enabled` always activates
//!   it; `bypass` forwards everything.
//! - `XR_EYEGAZE_SIMULATE`: use the simulated tracker instead of a device one.
//! - `XR_EYEGAZE_SIMULATED_GAZE`: `x,y` point in `[0,1]²` the simulated tracker
//!   looks at (`0.5,0.5` is straight ahead).
//! - `XR_EYEGAZE_TRACE`: path of the JSONL trace file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{RwLock, const_rwlock};

/// When the layer takes part in dispatch for an instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerMode {
    /// Active only when the application requested eye gaze interaction.
    #[default]
    Auto,
    /// Always active.
    Enabled,
    /// Never active; every lookup goes to the layer below.
    Bypass,
}

impl LayerMode {
    /// Parse from string (case-insensitive). Unknown values mean `Auto`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "enable" | "on" | "force" | "1" => Self::Enabled,
            "bypass" | "off" | "disabled" | "0" => Self::Bypass,
            _ => Self::Auto,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Enabled => "enabled",
            Self::Bypass => "bypass",
        }
    }

    /// Whether an instance is bypassed given what the application asked for.
    #[must_use]
    pub const fn bypasses(self, app_requested_eye_gaze: bool) -> bool {
        match self {
            Self::Auto => !app_requested_eye_gaze,
            Self::Enabled => false,
            Self::Bypass => true,
        }
    }
}

/// Default simulated gaze point: the center of the view.
pub const CENTERED_GAZE: (f32, f32) = (0.5, 0.5);

/// Every setting of the layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    pub mode: LayerMode,
    pub simulate: bool,
    pub simulated_gaze: (f32, f32),
    pub trace_path: Option<PathBuf>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            mode: LayerMode::Auto,
            simulate: false,
            simulated_gaze: CENTERED_GAZE,
            trace_path: None,
        }
    }
}

impl LayerSettings {
    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mode = lookup("XR_EYEGAZE_MODE")
            .map(|v| LayerMode::from_str_loose(&v))
            .unwrap_or_default();
        let simulate = lookup("XR_EYEGAZE_SIMULATE").is_some_and(|v| parse_flag(&v));
        let simulated_gaze = lookup("XR_EYEGAZE_SIMULATED_GAZE")
            .and_then(|v| parse_gaze_point(&v))
            .unwrap_or(CENTERED_GAZE);
        let trace_path = lookup("XR_EYEGAZE_TRACE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            mode,
            simulate,
            simulated_gaze,
            trace_path,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `x,y` with both coordinates in `[0,1]`.
fn parse_gaze_point(raw: &str) -> Option<(f32, f32)> {
    let (x, y) = raw.split_once(',')?;
    let x: f32 = x.trim().parse().ok()?;
    let y: f32 = y.trim().parse().ok()?;
    ((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)).then_some((x, y))
}

// Cache state: the first caller claims RESOLVING and reads the environment;
// callers racing with it get defaults instead of waiting.
const UNRESOLVED: u8 = 0;
const RESOLVING: u8 = 1;
const READY: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNRESOLVED);
static CACHED: RwLock<Option<Arc<LayerSettings>>> = const_rwlock(None);

/// Process-wide settings (reads the environment on first call).
#[must_use]
pub fn settings() -> Arc<LayerSettings> {
    if STATE.load(Ordering::Acquire) == READY
        && let Some(cached) = CACHED.read().as_ref()
    {
        return Arc::clone(cached);
    }

    if STATE
        .compare_exchange(UNRESOLVED, RESOLVING, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return CACHED
            .read()
            .clone()
            .unwrap_or_else(|| Arc::new(LayerSettings::default()));
    }

    let resolved = Arc::new(LayerSettings::from_env());
    *CACHED.write() = Some(Arc::clone(&resolved));
    STATE.store(READY, Ordering::Release);
    resolved
}

/// Pin the cached settings (`Some`) or drop them so the next call re-reads the
/// environment (`None`).
pub fn install_settings_for_tests(settings: Option<LayerSettings>) {
    let mut cached = CACHED.write();
    match settings {
        Some(settings) => {
            *cached = Some(Arc::new(settings));
            STATE.store(READY, Ordering::Release);
        }
        None => {
            *cached = None;
            STATE.store(UNRESOLVED, Ordering::Release);
        }
    }
}
