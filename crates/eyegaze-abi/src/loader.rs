//! OpenXR loader protocol: interface negotiation and `xrCreateApiLayerInstance`.

use std::ffi::{CStr, CString, c_char};
use std::ptr;

use eyegaze_core::InstanceGaze;
use eyegaze_dispatch::config;
use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use eyegaze_dispatch::{
    DispatchError, ExtensionName, ExtensionSet, FunctionName, LAYER_NAME, ProcResolver,
};
use openxr_sys as xr;
use openxr_sys::pfn;
use serde_json::json;

use crate::entry;
use crate::next::{self, NextProcAddr, check, fixed_str};
use crate::state::{self, InstanceState, LayerInstance};

pub const CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_NEXT_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;

/// `XrLoaderInterfaceStructs`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LoaderInterfaceStruct(i32);

impl LoaderInterfaceStruct {
    pub const UNINITIALIZED: Self = Self(0);
    pub const LOADER_INFO: Self = Self(1);
    pub const API_LAYER_REQUEST: Self = Self(2);
    pub const RUNTIME_REQUEST: Self = Self(3);
    pub const API_LAYER_CREATE_INFO: Self = Self(4);
    pub const API_LAYER_NEXT_INFO: Self = Self(5);
}

pub type FnCreateApiLayerInstance = unsafe extern "system" fn(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct NegotiateLoaderInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: xr::Version,
    pub max_api_version: xr::Version,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct NegotiateApiLayerRequest {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: xr::Version,
    pub get_instance_proc_addr: Option<pfn::GetInstanceProcAddr>,
    pub create_api_layer_instance: Option<FnCreateApiLayerInstance>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerNextInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; xr::MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: pfn::GetInstanceProcAddr,
    pub next_create_api_layer_instance: FnCreateApiLayerInstance,
    pub next: *mut ApiLayerNextInfo,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerCreateInfo {
    pub ty: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *const (),
    pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut ApiLayerNextInfo,
}

/// Extensions the layer strips from the application's request; they are
/// re-added below only if the next layer offers them.
const BLOCKED_EXTENSIONS: &[ExtensionName] = &[ExtensionName::EyeGazeInteraction];

/// Entry point the loader resolves by name.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const NegotiateLoaderInfo,
    api_layer_name: *const c_char,
    api_layer_request: *mut NegotiateApiLayerRequest,
) -> xr::Result {
    // SAFETY: the loader passes valid or null pointers.
    let (Some(info), Some(request)) = (unsafe { loader_info.as_ref() }, unsafe {
        api_layer_request.as_mut()
    }) else {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    };
    if !api_layer_name.is_null() {
        // SAFETY: non-null layer names are NUL-terminated.
        let name = unsafe { CStr::from_ptr(api_layer_name) };
        if name.to_bytes() != LAYER_NAME.as_bytes() {
            return xr::Result::ERROR_INITIALIZATION_FAILED;
        }
    }
    if !loader_info_acceptable(info) || !api_layer_request_acceptable(request) {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    }
    if let Err(err) = state::runtime() {
        return err.to_xr_result();
    }

    request.layer_interface_version = CURRENT_LOADER_API_LAYER_VERSION;
    request.layer_api_version = xr::CURRENT_API_VERSION;
    request.get_instance_proc_addr = Some(entry::xr_get_instance_proc_addr);
    request.create_api_layer_instance = Some(xr_create_api_layer_instance);
    trace::record(|| {
        TraceEntry::new(TraceLevel::Info, "loader_negotiated").with_details(json!({
            "interface_version": CURRENT_LOADER_API_LAYER_VERSION,
            "variant": state::MANIFEST_VARIANT.as_str(),
        }))
    });
    xr::Result::SUCCESS
}

fn loader_info_acceptable(info: &NegotiateLoaderInfo) -> bool {
    info.ty == LoaderInterfaceStruct::LOADER_INFO
        && info.struct_version == LOADER_INFO_STRUCT_VERSION
        && info.struct_size == std::mem::size_of::<NegotiateLoaderInfo>()
        && (info.min_interface_version..=info.max_interface_version)
            .contains(&CURRENT_LOADER_API_LAYER_VERSION)
}

fn api_layer_request_acceptable(request: &NegotiateApiLayerRequest) -> bool {
    request.ty == LoaderInterfaceStruct::API_LAYER_REQUEST
        && request.struct_version == API_LAYER_INFO_STRUCT_VERSION
        && request.struct_size == std::mem::size_of::<NegotiateApiLayerRequest>()
}

/// Instance creation as seen by this layer.
pub unsafe extern "system" fn xr_create_api_layer_instance(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
        create_api_layer_instance(info, api_layer_info, instance)
    }));
    match result {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Error, "instance_create_failed")
                    .with_function(FunctionName::CreateInstance)
                    .with_details(json!({ "error": err.to_string() }))
            });
            err.to_xr_result()
        }
        Err(_) => xr::Result::ERROR_RUNTIME_FAILURE,
    }
}

unsafe fn create_api_layer_instance(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> Result<xr::Result, DispatchError> {
    let runtime = state::runtime()?;
    // SAFETY: the loader passes valid or null pointers.
    let (Some(create_info), Some(layer_info)) = (unsafe { info.as_ref() }, unsafe {
        api_layer_info.as_ref()
    }) else {
        return Err(DispatchError::InvalidArgument("XrInstanceCreateInfo"));
    };
    if instance.is_null() || create_info.ty != xr::InstanceCreateInfo::TYPE {
        return Err(DispatchError::InvalidArgument("XrInstanceCreateInfo"));
    }
    // SAFETY: the chain is owned by the loader for the duration of the call.
    let Some(next_info) = (unsafe { layer_info.next_info.as_ref() }) else {
        return Err(DispatchError::InvalidArgument("XrApiLayerCreateInfo"));
    };
    if next_info.ty != LoaderInterfaceStruct::API_LAYER_NEXT_INFO
        || fixed_str(&next_info.layer_name) != LAYER_NAME
    {
        return Err(DispatchError::InvalidArgument("XrApiLayerNextInfo"));
    }

    let settings = config::settings();
    // SAFETY: `enabledExtensionNames` holds `enabledExtensionCount` strings.
    let app_extensions = unsafe {
        c_strings(
            create_info.enabled_extension_names,
            create_info.enabled_extension_count,
        )
    };
    let requested = ExtensionSet::from_names(app_extensions.iter().map(String::as_str));
    let bypass = settings
        .mode
        .bypasses(requested.contains(ExtensionName::EyeGazeInteraction));
    state::remember_next_gipa(next_info.next_get_instance_proc_addr);
    // SAFETY: the next layer's entry points are live during instance creation.
    let available_below = unsafe { extensions_below(next_info.next_get_instance_proc_addr) };

    let downstream = if bypass {
        app_extensions.clone()
    } else {
        downstream_extensions(&app_extensions, runtime.manifest().extensions(), available_below)
    };
    let downstream_c: Vec<CString> = downstream
        .iter()
        .filter_map(|name| CString::new(name.as_str()).ok())
        .collect();
    let downstream_ptrs: Vec<*const c_char> = downstream_c.iter().map(|s| s.as_ptr()).collect();

    let mut chained_info = *create_info;
    chained_info.enabled_extension_count = downstream_ptrs.len() as u32;
    chained_info.enabled_extension_names = if downstream_ptrs.is_empty() {
        ptr::null()
    } else {
        downstream_ptrs.as_ptr()
    };
    let mut chained_layer_info = *layer_info;
    chained_layer_info.next_info = next_info.next;

    // SAFETY: every pointer in both structures outlives the call.
    let result = unsafe {
        (next_info.next_create_api_layer_instance)(&chained_info, &chained_layer_info, instance)
    };
    check(result)?;
    // SAFETY: checked non-null above and filled in by the next layer.
    let handle = unsafe { *instance };

    let next = NextProcAddr {
        gipa: next_info.next_get_instance_proc_addr,
        instance: handle,
    };
    let state = InstanceState {
        next,
        gaze: InstanceGaze::new(settings.simulate, settings.simulated_gaze),
    };
    let attached = runtime.attach_instance(
        handle.into_raw(),
        next,
        requested,
        ExtensionSet::from_names(downstream.iter().map(String::as_str)).intersection(available_below),
        bypass,
        state,
    );
    let context = match attached {
        Ok(context) => context,
        Err(err) => {
            // SAFETY: the instance was just created by the next layer.
            unsafe { destroy_below(next, handle) };
            return Err(err);
        }
    };
    if bypass {
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "layer_bypassed").with_handle(handle.into_raw())
        });
    } else {
        // SAFETY: the instance is live.
        unsafe { log_runtime(&context, handle) };
    }
    Ok(result)
}

/// What the application asked for, minus blocked extensions, plus every
/// declared extension the next layer offers.
fn downstream_extensions(
    app: &[String],
    declared: ExtensionSet,
    available_below: ExtensionSet,
) -> Vec<String> {
    let mut names: Vec<String> = app
        .iter()
        .filter(|name| {
            !BLOCKED_EXTENSIONS
                .iter()
                .any(|blocked| blocked.as_str() == name.as_str())
        })
        .cloned()
        .collect();
    for ext in declared.intersection(available_below).iter() {
        if !names.iter().any(|name| name == ext.as_str()) {
            names.push(ext.as_str().to_string());
        }
    }
    names
}

unsafe fn c_strings(names: *const *const c_char, count: u32) -> Vec<String> {
    if names.is_null() {
        return Vec::new();
    }
    (0..count as usize)
        .filter_map(|i| {
            // SAFETY: the caller guarantees `count` entries.
            let name = unsafe { *names.add(i) };
            // SAFETY: non-null entries are NUL-terminated.
            (!name.is_null()).then(|| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
        })
        .collect()
}

/// Instance extensions the next layer reports.
unsafe fn extensions_below(gipa: pfn::GetInstanceProcAddr) -> ExtensionSet {
    let lookup = NextProcAddr {
        gipa,
        instance: xr::Instance::from_raw(0),
    };
    let Some(f) = lookup.lookup(FunctionName::EnumerateInstanceExtensionProperties) else {
        return ExtensionSet::empty();
    };
    // SAFETY: the pointer was handed out for this name.
    let enumerate: pfn::EnumerateInstanceExtensionProperties =
        unsafe { eyegaze_dispatch::resolve::cast_function(f) };

    let mut count = 0u32;
    // SAFETY: capacity 0 only queries the count.
    if next::failed(unsafe { enumerate(ptr::null(), 0, &mut count, ptr::null_mut()) }) {
        return ExtensionSet::empty();
    }
    let mut properties: Vec<xr::ExtensionProperties> = (0..count)
        .map(|_| {
            // SAFETY: all-zero is a valid ExtensionProperties.
            let mut props: xr::ExtensionProperties = unsafe { std::mem::zeroed() };
            props.ty = xr::ExtensionProperties::TYPE;
            props
        })
        .collect();
    // SAFETY: `properties` holds `count` initialized entries.
    let result = unsafe { enumerate(ptr::null(), count, &mut count, properties.as_mut_ptr()) };
    if next::failed(result) {
        return ExtensionSet::empty();
    }
    properties.truncate(count as usize);
    let names: Vec<String> = properties
        .iter()
        .map(|props| fixed_str(&props.extension_name))
        .collect();
    ExtensionSet::from_names(names.iter().map(String::as_str))
}

unsafe fn destroy_below(next: NextProcAddr, handle: xr::Instance) {
    if let Some(f) = next.lookup(FunctionName::DestroyInstance) {
        // SAFETY: the pointer was handed out for xrDestroyInstance.
        let destroy: pfn::DestroyInstance = unsafe { eyegaze_dispatch::resolve::cast_function(f) };
        // SAFETY: `handle` is a live instance of the next layer.
        let _ = unsafe { destroy(handle) };
    }
}

unsafe fn log_runtime(context: &LayerInstance, handle: xr::Instance) {
    // SAFETY: the signature matches the name.
    let Ok(get_properties) = (unsafe {
        next::next_fn::<pfn::GetInstanceProperties>(context, FunctionName::GetInstanceProperties)
    }) else {
        return;
    };
    // SAFETY: all-zero is a valid InstanceProperties.
    let mut properties: xr::InstanceProperties = unsafe { std::mem::zeroed() };
    properties.ty = xr::InstanceProperties::TYPE;
    // SAFETY: `properties` is a valid out structure.
    if next::failed(unsafe { get_properties(handle, &mut properties) }) {
        return;
    }
    let version = properties.runtime_version;
    let runtime = format!(
        "{} {}.{}.{}",
        fixed_str(&properties.runtime_name),
        version.major(),
        version.minor(),
        version.patch()
    );
    trace::record(|| {
        TraceEntry::new(TraceLevel::Info, "runtime_detected")
            .with_handle(handle.into_raw())
            .with_details(json!({ "runtime": runtime }))
    });
}
