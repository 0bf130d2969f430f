//! Process-wide layer runtime.

use std::sync::OnceLock;

use eyegaze_core::{InstanceGaze, SessionGaze};
use eyegaze_dispatch::config;
use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel, TraceSink};
use eyegaze_dispatch::{DispatchError, InstanceContext, LayerRuntime, ManifestVariant};
use openxr_sys::pfn;
use parking_lot::{RwLock, const_rwlock};
use serde_json::json;

use crate::next::NextProcAddr;
use crate::overrides;

/// Manifest variant this library was built with.
#[cfg(feature = "social-eye-tracking")]
pub const MANIFEST_VARIANT: ManifestVariant = ManifestVariant::EyeGazeWithSocial;
#[cfg(not(feature = "social-eye-tracking"))]
pub const MANIFEST_VARIANT: ManifestVariant = ManifestVariant::EyeGaze;

/// Override state of one instance.
pub(crate) struct InstanceState {
    /// Lookup on the layer below, for names outside the catalogue.
    pub next: NextProcAddr,
    pub gaze: InstanceGaze,
}

pub(crate) type Runtime = LayerRuntime<InstanceState, SessionGaze>;
pub(crate) type LayerInstance = InstanceContext<InstanceState, SessionGaze>;

static RUNTIME: OnceLock<Result<Runtime, DispatchError>> = OnceLock::new();

/// Lookup of the layer below, kept from the last instance creation for
/// lookups made without an instance.
static NEXT_GIPA: RwLock<Option<pfn::GetInstanceProcAddr>> = const_rwlock(None);

pub(crate) fn remember_next_gipa(gipa: pfn::GetInstanceProcAddr) {
    *NEXT_GIPA.write() = Some(gipa);
}

pub(crate) fn next_gipa() -> Option<pfn::GetInstanceProcAddr> {
    *NEXT_GIPA.read()
}

/// The runtime, built on first use together with the trace sink.
pub(crate) fn runtime() -> Result<&'static Runtime, DispatchError> {
    RUNTIME
        .get_or_init(|| {
            install_trace_sink();
            LayerRuntime::new(MANIFEST_VARIANT.manifest(), &overrides::trampoline)
        })
        .as_ref()
        .map_err(Clone::clone)
}

fn install_trace_sink() {
    let settings = config::settings();
    let Some(path) = settings.trace_path.as_deref() else {
        return;
    };
    if trace::enabled() {
        return;
    }
    // Tracing is best effort; the layer works without it.
    let Ok(sink) = TraceSink::to_file(path) else {
        return;
    };
    trace::install(sink);
    trace::record(|| {
        TraceEntry::new(TraceLevel::Info, "layer_loaded").with_details(json!({
            "variant": MANIFEST_VARIANT.as_str(),
            "mode": settings.mode.as_str(),
            "simulate": settings.simulate,
        }))
    });
}

/// Tear the layer down. Returns how many instances were still live; later
/// instance creations fail with `XR_ERROR_INSTANCE_LOST`.
pub fn shutdown() -> usize {
    match RUNTIME.get() {
        Some(Ok(runtime)) => {
            let drained = runtime.shutdown();
            trace::uninstall();
            drained
        }
        _ => 0,
    }
}
