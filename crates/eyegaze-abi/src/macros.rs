//! Helper macros for trampoline generation.
//!
//! `layer_fn!` generates the `pub unsafe extern "system" fn` wrappers handed
//! out through `xrGetInstanceProcAddr`; `void_fn!` erases a trampoline's
//! signature for the dispatch table.

use std::panic::{AssertUnwindSafe, catch_unwind};

use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use eyegaze_dispatch::{DispatchError, FunctionName};
use openxr_sys as xr;

/// Run a trampoline body, fold its error into an `XrResult` and trace the call.
///
/// Panics never unwind into the caller: they become `XR_ERROR_RUNTIME_FAILURE`.
pub(crate) fn guarded(
    function: FunctionName,
    handle: u64,
    body: impl FnOnce() -> Result<xr::Result, DispatchError>,
) -> xr::Result {
    let result = match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Warn, "trampoline_failed")
                    .with_function(function)
                    .with_handle(handle)
                    .with_details(serde_json::json!({ "error": err.to_string() }))
            });
            err.to_xr_result()
        }
        Err(_) => {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Error, "trampoline_panicked")
                    .with_function(function)
                    .with_handle(handle)
            });
            xr::Result::ERROR_RUNTIME_FAILURE
        }
    };
    trace::record(|| {
        TraceEntry::new(TraceLevel::Debug, "trampoline")
            .with_function(function)
            .with_handle(handle)
            .with_result(result.into_raw())
    });
    result
}

/// Generate a trampoline for a catalogued function.
///
/// # Usage
///
/// ```ignore
/// layer_fn! {
///     /// Doc comment for the function.
///     fn xr_destroy_space(space: xr::Space) as DestroySpace {
///         // body returning Result<xr::Result, DispatchError>
///     }
/// }
/// ```
///
/// The first argument must be the dispatchable handle; it is recorded in the
/// trace. The body runs inside [`guarded`].
macro_rules! layer_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $handle:ident : $handlety:ty $(, $arg:ident : $argty:ty)* $(,)? ) as $function:ident
        $body:block
    ) => {
        $(#[$meta])*
        #[allow(unused_unsafe)]
        pub unsafe extern "system" fn $name( $handle : $handlety $(, $arg : $argty)* ) -> openxr_sys::Result {
            $crate::macros::guarded(
                eyegaze_dispatch::FunctionName::$function,
                $handle.into_raw(),
                || unsafe { $body },
            )
        }
    };
}

/// Erase a trampoline's signature: `void_fn!(xr_locate_space as pfn::LocateSpace)`.
macro_rules! void_fn {
    ($f:path as $pfn:ty) => {{
        let typed: $pfn = $f;
        // SAFETY: function pointers share one representation; the loader casts
        // the pointer back to `$pfn` before calling it.
        unsafe { std::mem::transmute::<$pfn, eyegaze_dispatch::VoidFunction>(typed) }
    }};
}

pub(crate) use {layer_fn, void_fn};
