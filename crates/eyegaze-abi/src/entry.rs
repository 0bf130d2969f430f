//! `xrGetInstanceProcAddr` and `xrDestroyInstance`: the entry points the layer
//! answers for every instance, bypassed or not.

use std::ffi::{CStr, c_char};

use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use eyegaze_dispatch::{DispatchError, FunctionName, ProcRoute, Resolution};
use openxr_sys as xr;
use openxr_sys::pfn;
use serde_json::json;

use crate::next::{self, check};
use crate::state;

layer_fn! {
    /// Upward lookup: the layer's trampoline, the cached next-layer pointer,
    /// or a direct lookup below for names outside the catalogue.
    fn xr_get_instance_proc_addr(
        instance: xr::Instance,
        name: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) as GetInstanceProcAddr {
        if name.is_null() || function.is_null() {
            return Err(DispatchError::InvalidArgument("name"));
        }
        *function = None;
        let name = CStr::from_ptr(name);
        if FunctionName::from_cstr(name) == Some(FunctionName::GetInstanceProcAddr) {
            *function = Some(void_fn!(xr_get_instance_proc_addr as pfn::GetInstanceProcAddr));
            return Ok(xr::Result::SUCCESS);
        }
        if instance.into_raw() == 0 {
            return Ok(pre_instance_lookup(name, function));
        }
        let runtime = state::runtime()?;
        let context = runtime
            .contexts()
            .instance(instance.into_raw())
            .ok_or(DispatchError::UnknownHandle(instance.into_raw()))?;

        let route = match name.to_str() {
            Ok(text) => runtime.proc_route(&context, text),
            Err(_) => ProcRoute::Forward,
        };
        trace::record(|| {
            TraceEntry::new(TraceLevel::Trace, "proc_addr")
                .with_handle(instance.into_raw())
                .with_details(json!({
                    "name": name.to_string_lossy(),
                    "route": format!("{route:?}"),
                }))
        });
        match route {
            ProcRoute::Layer(f) | ProcRoute::Next(Resolution::Resolved(f)) => {
                *function = Some(f);
                Ok(xr::Result::SUCCESS)
            }
            ProcRoute::Next(Resolution::Missing | Resolution::ExtensionDisabled(_)) => {
                Ok(xr::Result::ERROR_FUNCTION_UNSUPPORTED)
            }
            ProcRoute::Forward => {
                let below = context.state().next;
                Ok((below.gipa)(instance, name.as_ptr(), function))
            }
        }
    }
}

/// Functions `xrGetInstanceProcAddr` answers for `XR_NULL_HANDLE`.
const PRE_INSTANCE_FUNCTIONS: [&CStr; 3] = [
    c"xrEnumerateInstanceExtensionProperties",
    c"xrEnumerateApiLayerProperties",
    c"xrCreateInstance",
];

/// Lookup without an instance: pre-instance names go to the layer below,
/// everything else is an invalid handle.
unsafe fn pre_instance_lookup(
    name: &CStr,
    function: *mut Option<pfn::VoidFunction>,
) -> xr::Result {
    if !PRE_INSTANCE_FUNCTIONS.contains(&name) {
        return xr::Result::ERROR_HANDLE_INVALID;
    }
    trace::record(|| {
        TraceEntry::new(TraceLevel::Trace, "proc_addr")
            .with_details(json!({ "name": name.to_string_lossy(), "route": "PreInstance" }))
    });
    match state::next_gipa() {
        // SAFETY: the lookup below stays loaded while the layer is.
        Some(gipa) => unsafe { gipa(xr::Instance::from_raw(0), name.as_ptr(), function) },
        None => xr::Result::ERROR_FUNCTION_UNSUPPORTED,
    }
}

layer_fn! {
    /// Release the instance's contexts, then destroy it below. Only the call
    /// that removes the instance forwards.
    fn xr_destroy_instance(instance: xr::Instance) as DestroyInstance {
        let runtime = state::runtime()?;
        let context = runtime
            .detach_instance(instance.into_raw())
            .ok_or(DispatchError::UnknownHandle(instance.into_raw()))?;
        if let Some(tracker) = context.state().gaze.tracker() {
            tracker.stop();
        }
        let destroy: pfn::DestroyInstance =
            next::next_fn(&context, FunctionName::DestroyInstance)?;
        check(destroy(instance))
    }
}
