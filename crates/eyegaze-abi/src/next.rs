//! Calls into the next layer.

use std::ffi::{CStr, c_char};

use eyegaze_dispatch::{DispatchError, FunctionName, ProcResolver, VoidFunction};
use openxr_sys as xr;
use openxr_sys::pfn;

use crate::state::LayerInstance;

/// The next layer's `xrGetInstanceProcAddr`, scoped to one instance.
#[derive(Clone, Copy)]
pub(crate) struct NextProcAddr {
    pub gipa: pfn::GetInstanceProcAddr,
    pub instance: xr::Instance,
}

impl NextProcAddr {
    /// Look up any name, catalogued or not.
    ///
    /// # Safety
    ///
    /// `gipa` must be a live `xrGetInstanceProcAddr`.
    pub unsafe fn lookup_raw(&self, name: &CStr) -> Option<VoidFunction> {
        let mut function = None;
        // SAFETY: `name` is NUL-terminated and `function` is a valid out slot.
        let result = unsafe { (self.gipa)(self.instance, name.as_ptr(), &mut function) };
        if failed(result) { None } else { function }
    }
}

impl ProcResolver for NextProcAddr {
    fn lookup(&self, name: FunctionName) -> Option<VoidFunction> {
        // SAFETY: the loader keeps the next layer loaded for the lifetime of
        // the instance this resolver belongs to.
        unsafe { self.lookup_raw(name.as_cstr()) }
    }
}

#[must_use]
pub(crate) fn failed(result: xr::Result) -> bool {
    result.into_raw() < 0
}

/// Turn a failure code from below into an error, keeping success codes.
pub(crate) fn check(result: xr::Result) -> Result<xr::Result, DispatchError> {
    if failed(result) {
        Err(DispatchError::from_next(result))
    } else {
        Ok(result)
    }
}

/// Typed next-layer entry point for `name`.
///
/// # Safety
///
/// `F` must be the `pfn` type of `name`.
pub(crate) unsafe fn next_fn<F: Copy>(
    instance: &LayerInstance,
    name: FunctionName,
) -> Result<F, DispatchError> {
    // SAFETY: forwarded to the caller.
    unsafe { instance.next().resolve_as::<F>(name, instance.extensions()) }
}

/// Text of a fixed-size, NUL-terminated OpenXR string field.
#[must_use]
pub(crate) fn fixed_str(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
