//! In-process stand-in for the layer below: a handful of `extern "system"`
//! entry points that log their calls and answer from a shared configuration.

#![allow(dead_code)]

use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use eyegaze_abi::loader::{
    API_LAYER_CREATE_INFO_STRUCT_VERSION, API_LAYER_INFO_STRUCT_VERSION,
    API_LAYER_MAX_SETTINGS_PATH_SIZE, API_LAYER_NEXT_INFO_STRUCT_VERSION, FnCreateApiLayerInstance,
    LOADER_INFO_STRUCT_VERSION,
};
use eyegaze_abi::{
    ApiLayerCreateInfo, ApiLayerNextInfo, LoaderInterfaceStruct, NegotiateApiLayerRequest,
    NegotiateLoaderInfo, xrNegotiateLoaderApiLayerInterface,
};
use eyegaze_dispatch::config::{self, LayerMode, LayerSettings};
use eyegaze_dispatch::{LAYER_NAME, VoidFunction};
use openxr_sys as xr;
use openxr_sys::pfn;
use parking_lot::{Mutex, const_mutex};

pub static TEST_LOCK: Mutex<()> = const_mutex(());

pub const SYSTEM_ID: u64 = 7;
pub const VIEW_HEIGHT: f32 = 1.7;
pub const DISPLAY_TIME: i64 = 1_000;

/// What the fake runtime reports.
#[derive(Debug, Clone)]
pub struct Below {
    pub extensions: Vec<&'static str>,
    pub system_name: &'static str,
    pub native_eye_gaze: bool,
    pub social_eye_tracking: bool,
}

impl Default for Below {
    fn default() -> Self {
        Self {
            extensions: vec!["XR_KHR_composition_layer_depth"],
            system_name: "Test HMD",
            native_eye_gaze: false,
            social_eye_tracking: false,
        }
    }
}

struct World {
    below: Option<Below>,
    calls: Vec<&'static str>,
    downstream_extensions: Vec<String>,
    paths: Vec<String>,
    view_spaces: Vec<u64>,
}

static WORLD: Mutex<World> = const_mutex(World {
    below: None,
    calls: Vec::new(),
    downstream_extensions: Vec::new(),
    paths: Vec::new(),
    view_spaces: Vec::new(),
});

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

/// When set, `xrCreateSession` below destroys its instance through the layer
/// before returning, as a racing application thread would.
static DESTROY_INSTANCE_IN_CREATE_SESSION: AtomicBool = AtomicBool::new(false);

pub fn destroy_instance_during_session_creation(enabled: bool) {
    DESTROY_INSTANCE_IN_CREATE_SESSION.store(enabled, Ordering::SeqCst);
}

fn new_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

fn called(name: &'static str) {
    WORLD.lock().calls.push(name);
}

fn below() -> Below {
    WORLD.lock().below.clone().unwrap_or_default()
}

/// Forget every call and pin the layer settings.
pub fn reset(below: Below, settings: LayerSettings) {
    let mut world = WORLD.lock();
    world.below = Some(below);
    world.calls.clear();
    world.downstream_extensions.clear();
    world.view_spaces.clear();
    drop(world);
    destroy_instance_during_session_creation(false);
    config::install_settings_for_tests(Some(settings));
}

pub fn simulated_settings() -> LayerSettings {
    LayerSettings {
        mode: LayerMode::Auto,
        simulate: true,
        ..LayerSettings::default()
    }
}

/// How many times the fake runtime's `name` ran.
pub fn calls(name: &str) -> usize {
    WORLD.lock().calls.iter().filter(|c| **c == name).count()
}

/// Extensions the layer passed to the fake runtime at the last creation.
pub fn downstream_extensions() -> Vec<String> {
    WORLD.lock().downstream_extensions.clone()
}

fn fill(dst: &mut [c_char], text: &str) {
    for (slot, byte) in dst.iter_mut().zip(text.bytes()) {
        *slot = byte as c_char;
    }
    dst[text.len().min(dst.len() - 1)] = 0;
}

macro_rules! erase {
    ($f:ident as $pfn:ty) => {
        unsafe { std::mem::transmute::<$pfn, VoidFunction>($f as $pfn) }
    };
}

unsafe extern "system" fn get_instance_proc_addr(
    _instance: xr::Instance,
    name: *const c_char,
    function: *mut Option<VoidFunction>,
) -> xr::Result {
    let name = unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("");
    let found = lookup(name);
    unsafe { *function = found };
    if found.is_some() {
        xr::Result::SUCCESS
    } else {
        xr::Result::ERROR_FUNCTION_UNSUPPORTED
    }
}

/// The fake runtime's own pointer for `name`.
pub fn lookup(name: &str) -> Option<VoidFunction> {
    Some(match name {
        "xrEnumerateInstanceExtensionProperties" => erase!(
            enumerate_instance_extension_properties as pfn::EnumerateInstanceExtensionProperties
        ),
        "xrDestroyInstance" => erase!(destroy_instance as pfn::DestroyInstance),
        "xrGetInstanceProperties" => erase!(get_instance_properties as pfn::GetInstanceProperties),
        "xrGetSystem" => erase!(get_system as pfn::GetSystem),
        "xrGetSystemProperties" => erase!(get_system_properties as pfn::GetSystemProperties),
        "xrStringToPath" => erase!(string_to_path as pfn::StringToPath),
        "xrPathToString" => erase!(path_to_string as pfn::PathToString),
        "xrSuggestInteractionProfileBindings" => {
            erase!(suggest_bindings as pfn::SuggestInteractionProfileBindings)
        }
        "xrCreateSession" => erase!(create_session as pfn::CreateSession),
        "xrDestroySession" => erase!(destroy_session as pfn::DestroySession),
        "xrCreateReferenceSpace" => erase!(create_reference_space as pfn::CreateReferenceSpace),
        "xrCreateActionSpace" => erase!(create_action_space as pfn::CreateActionSpace),
        "xrDestroySpace" => erase!(destroy_space as pfn::DestroySpace),
        "xrLocateSpace" => erase!(locate_space as pfn::LocateSpace),
        "xrWaitFrame" => erase!(wait_frame as pfn::WaitFrame),
        "xrBeginFrame" => erase!(begin_frame as pfn::BeginFrame),
        "xrGetActionStatePose" => erase!(get_action_state_pose as pfn::GetActionStatePose),
        "xrGetCurrentInteractionProfile" => {
            erase!(get_current_interaction_profile as pfn::GetCurrentInteractionProfile)
        }
        "xrCreateEyeTrackerFB" => erase!(create_eye_tracker as pfn::CreateEyeTrackerFB),
        "xrGetEyeGazesFB" => erase!(get_eye_gazes as pfn::GetEyeGazesFB),
        _ => return None,
    })
}

unsafe extern "system" fn create_api_layer_instance(
    info: *const xr::InstanceCreateInfo,
    _api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    called("xrCreateApiLayerInstance");
    let info = unsafe { &*info };
    let names: Vec<String> = (0..info.enabled_extension_count as usize)
        .map(|i| {
            let name = unsafe { *info.enabled_extension_names.add(i) };
            unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
        })
        .collect();
    WORLD.lock().downstream_extensions = names;
    unsafe { *instance = xr::Instance::from_raw(new_handle()) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn enumerate_instance_extension_properties(
    _layer_name: *const c_char,
    capacity: u32,
    count: *mut u32,
    properties: *mut xr::ExtensionProperties,
) -> xr::Result {
    let extensions = below().extensions;
    unsafe { *count = extensions.len() as u32 };
    if capacity == 0 {
        return xr::Result::SUCCESS;
    }
    if (capacity as usize) < extensions.len() {
        return xr::Result::ERROR_SIZE_INSUFFICIENT;
    }
    for (i, name) in extensions.iter().enumerate() {
        let props = unsafe { &mut *properties.add(i) };
        fill(&mut props.extension_name, name);
        props.extension_version = 1;
    }
    xr::Result::SUCCESS
}

unsafe extern "system" fn destroy_instance(_instance: xr::Instance) -> xr::Result {
    called("xrDestroyInstance");
    xr::Result::SUCCESS
}

unsafe extern "system" fn get_instance_properties(
    _instance: xr::Instance,
    properties: *mut xr::InstanceProperties,
) -> xr::Result {
    called("xrGetInstanceProperties");
    let properties = unsafe { &mut *properties };
    fill(&mut properties.runtime_name, "Fake Runtime");
    properties.runtime_version = xr::Version::new(1, 2, 3);
    xr::Result::SUCCESS
}

unsafe extern "system" fn get_system(
    _instance: xr::Instance,
    _info: *const xr::SystemGetInfo,
    system_id: *mut xr::SystemId,
) -> xr::Result {
    called("xrGetSystem");
    unsafe { *system_id = xr::SystemId::from_raw(SYSTEM_ID) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn get_system_properties(
    _instance: xr::Instance,
    _system_id: xr::SystemId,
    properties: *mut xr::SystemProperties,
) -> xr::Result {
    called("xrGetSystemProperties");
    let below = below();
    let properties = unsafe { &mut *properties };
    fill(&mut properties.system_name, below.system_name);
    let mut next = properties.next.cast::<xr::BaseOutStructure>();
    while let Some(entry) = unsafe { next.as_mut() } {
        if entry.ty == xr::StructureType::SYSTEM_EYE_GAZE_INTERACTION_PROPERTIES_EXT {
            let props = next.cast::<xr::SystemEyeGazeInteractionPropertiesEXT>();
            unsafe { (*props).supports_eye_gaze_interaction = bool32(below.native_eye_gaze) };
        } else if entry.ty == xr::StructureType::SYSTEM_EYE_TRACKING_PROPERTIES_FB {
            let props = next.cast::<xr::SystemEyeTrackingPropertiesFB>();
            unsafe { (*props).supports_eye_tracking = bool32(below.social_eye_tracking) };
        }
        next = entry.next;
    }
    xr::Result::SUCCESS
}

pub fn bool32(value: bool) -> xr::Bool32 {
    if value { xr::TRUE } else { xr::FALSE }
}

unsafe extern "system" fn string_to_path(
    _instance: xr::Instance,
    text: *const c_char,
    path: *mut xr::Path,
) -> xr::Result {
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned();
    let mut world = WORLD.lock();
    let index = match world.paths.iter().position(|p| *p == text) {
        Some(index) => index,
        None => {
            world.paths.push(text);
            world.paths.len() - 1
        }
    };
    unsafe { *path = xr::Path::from_raw(index as u64 + 1) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn path_to_string(
    _instance: xr::Instance,
    path: xr::Path,
    capacity: u32,
    count: *mut u32,
    buffer: *mut c_char,
) -> xr::Result {
    let world = WORLD.lock();
    let Some(text) = (path.into_raw() as usize)
        .checked_sub(1)
        .and_then(|index| world.paths.get(index))
    else {
        return xr::Result::ERROR_PATH_INVALID;
    };
    let needed = text.len() + 1;
    unsafe { *count = needed as u32 };
    if (capacity as usize) < needed {
        return xr::Result::ERROR_SIZE_INSUFFICIENT;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(buffer, needed) };
    fill(out, text);
    xr::Result::SUCCESS
}

unsafe extern "system" fn suggest_bindings(
    _instance: xr::Instance,
    _bindings: *const xr::InteractionProfileSuggestedBinding,
) -> xr::Result {
    called("xrSuggestInteractionProfileBindings");
    xr::Result::SUCCESS
}

unsafe extern "system" fn create_session(
    instance: xr::Instance,
    _info: *const xr::SessionCreateInfo,
    session: *mut xr::Session,
) -> xr::Result {
    called("xrCreateSession");
    if DESTROY_INSTANCE_IN_CREATE_SESSION.load(Ordering::SeqCst) {
        unsafe { eyegaze_abi::entry::xr_destroy_instance(instance) };
    }
    unsafe { *session = xr::Session::from_raw(new_handle()) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn destroy_session(_session: xr::Session) -> xr::Result {
    called("xrDestroySession");
    xr::Result::SUCCESS
}

unsafe extern "system" fn create_reference_space(
    _session: xr::Session,
    info: *const xr::ReferenceSpaceCreateInfo,
    space: *mut xr::Space,
) -> xr::Result {
    called("xrCreateReferenceSpace");
    let handle = new_handle();
    if unsafe { (*info).reference_space_type } == xr::ReferenceSpaceType::VIEW {
        WORLD.lock().view_spaces.push(handle);
    }
    unsafe { *space = xr::Space::from_raw(handle) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn create_action_space(
    _session: xr::Session,
    _info: *const xr::ActionSpaceCreateInfo,
    space: *mut xr::Space,
) -> xr::Result {
    called("xrCreateActionSpace");
    unsafe { *space = xr::Space::from_raw(new_handle()) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn destroy_space(_space: xr::Space) -> xr::Result {
    called("xrDestroySpace");
    xr::Result::SUCCESS
}

/// View spaces sit `VIEW_HEIGHT` above every other space, looking forward.
unsafe extern "system" fn locate_space(
    space: xr::Space,
    _base_space: xr::Space,
    _time: xr::Time,
    location: *mut xr::SpaceLocation,
) -> xr::Result {
    called("xrLocateSpace");
    let is_view = WORLD.lock().view_spaces.contains(&space.into_raw());
    let location = unsafe { &mut *location };
    if is_view {
        location.pose = xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f {
                x: 0.0,
                y: VIEW_HEIGHT,
                z: 0.0,
            },
        };
        location.location_flags = xr::SpaceLocationFlags::ORIENTATION_VALID
            | xr::SpaceLocationFlags::ORIENTATION_TRACKED
            | xr::SpaceLocationFlags::POSITION_VALID
            | xr::SpaceLocationFlags::POSITION_TRACKED;
    } else {
        location.location_flags = xr::SpaceLocationFlags::EMPTY;
    }
    xr::Result::SUCCESS
}

unsafe extern "system" fn wait_frame(
    _session: xr::Session,
    _info: *const xr::FrameWaitInfo,
    state: *mut xr::FrameState,
) -> xr::Result {
    called("xrWaitFrame");
    unsafe { (*state).predicted_display_time = xr::Time::from_nanos(DISPLAY_TIME) };
    xr::Result::SUCCESS
}

unsafe extern "system" fn begin_frame(
    _session: xr::Session,
    _info: *const xr::FrameBeginInfo,
) -> xr::Result {
    called("xrBeginFrame");
    xr::Result::SUCCESS
}

unsafe extern "system" fn get_action_state_pose(
    _session: xr::Session,
    _info: *const xr::ActionStateGetInfo,
    state: *mut xr::ActionStatePose,
) -> xr::Result {
    called("xrGetActionStatePose");
    unsafe { (*state).is_active = xr::FALSE };
    xr::Result::SUCCESS
}

unsafe extern "system" fn get_current_interaction_profile(
    _session: xr::Session,
    _top_level_user_path: xr::Path,
    _state: *mut xr::InteractionProfileState,
) -> xr::Result {
    called("xrGetCurrentInteractionProfile");
    xr::Result::SUCCESS
}

unsafe extern "system" fn create_eye_tracker(
    _session: xr::Session,
    _info: *const xr::EyeTrackerCreateInfoFB,
    eye_tracker: *mut xr::EyeTrackerFB,
) -> xr::Result {
    called("xrCreateEyeTrackerFB");
    unsafe { *eye_tracker = xr::EyeTrackerFB::from_raw(new_handle()) };
    xr::Result::SUCCESS
}

/// Both eyes valid, confident and looking straight ahead.
unsafe extern "system" fn get_eye_gazes(
    _eye_tracker: xr::EyeTrackerFB,
    _info: *const xr::EyeGazesInfoFB,
    gazes: *mut xr::EyeGazesFB,
) -> xr::Result {
    called("xrGetEyeGazesFB");
    let gazes = unsafe { &mut *gazes };
    for eye in &mut gazes.gaze {
        eye.is_valid = xr::TRUE;
        eye.gaze_confidence = 0.9;
        eye.gaze_pose = xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
        };
    }
    xr::Result::SUCCESS
}

/// Negotiate as the loader would.
pub fn negotiate(layer_name: &str) -> Result<NegotiateApiLayerRequest, xr::Result> {
    let info = NegotiateLoaderInfo {
        ty: LoaderInterfaceStruct::LOADER_INFO,
        struct_version: LOADER_INFO_STRUCT_VERSION,
        struct_size: std::mem::size_of::<NegotiateLoaderInfo>(),
        min_interface_version: 1,
        max_interface_version: 1,
        min_api_version: xr::Version::new(1, 0, 0),
        max_api_version: xr::Version::new(1, 0, 99),
    };
    let mut request = NegotiateApiLayerRequest {
        ty: LoaderInterfaceStruct::API_LAYER_REQUEST,
        struct_version: API_LAYER_INFO_STRUCT_VERSION,
        struct_size: std::mem::size_of::<NegotiateApiLayerRequest>(),
        layer_interface_version: 0,
        layer_api_version: xr::Version::new(0, 0, 0),
        get_instance_proc_addr: None,
        create_api_layer_instance: None,
    };
    let name = CString::new(layer_name).unwrap();
    let result = unsafe { xrNegotiateLoaderApiLayerInterface(&info, name.as_ptr(), &mut request) };
    if result == xr::Result::SUCCESS {
        Ok(request)
    } else {
        Err(result)
    }
}

/// A created instance and the layer's lookup for it.
pub struct Layer {
    pub instance: xr::Instance,
    pub gipa: pfn::GetInstanceProcAddr,
}

impl Layer {
    /// Typed pointer the layer hands out for `name`.
    pub fn proc<F: Copy>(&self, name: &str) -> Option<F> {
        let name = CString::new(name).unwrap();
        let mut function = None;
        let result = unsafe { (self.gipa)(self.instance, name.as_ptr(), &mut function) };
        assert!(result.into_raw() >= 0 || function.is_none());
        function.map(|f| unsafe { std::mem::transmute_copy::<VoidFunction, F>(&f) })
    }

    /// Raw pointer the layer hands out for `name`.
    pub fn raw(&self, name: &str) -> Option<VoidFunction> {
        self.proc::<VoidFunction>(name)
    }

    pub fn string_to_path(&self, text: &str) -> xr::Path {
        let f: pfn::StringToPath = self.proc("xrStringToPath").unwrap();
        let text = CString::new(text).unwrap();
        let mut path = xr::Path::from_raw(0);
        assert_eq!(unsafe { f(self.instance, text.as_ptr(), &mut path) }, xr::Result::SUCCESS);
        path
    }

    pub fn destroy(&self) -> xr::Result {
        let f: pfn::DestroyInstance = self.proc("xrDestroyInstance").unwrap();
        unsafe { f(self.instance) }
    }
}

/// Run `xrCreateApiLayerInstance` through the negotiated request, with the
/// fake runtime as the next layer.
pub fn create_instance(extensions: &[&str]) -> Result<Layer, xr::Result> {
    let request = negotiate(LAYER_NAME)?;
    let create: FnCreateApiLayerInstance = request.create_api_layer_instance.unwrap();
    let gipa = request.get_instance_proc_addr.unwrap();

    let names: Vec<CString> = extensions.iter().map(|e| CString::new(*e).unwrap()).collect();
    let pointers: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
    let mut info: xr::InstanceCreateInfo = unsafe { std::mem::zeroed() };
    info.ty = xr::InstanceCreateInfo::TYPE;
    info.enabled_extension_count = pointers.len() as u32;
    info.enabled_extension_names = if pointers.is_empty() {
        ptr::null()
    } else {
        pointers.as_ptr()
    };

    let mut next_info = ApiLayerNextInfo {
        ty: LoaderInterfaceStruct::API_LAYER_NEXT_INFO,
        struct_version: API_LAYER_NEXT_INFO_STRUCT_VERSION,
        struct_size: std::mem::size_of::<ApiLayerNextInfo>(),
        layer_name: [0; xr::MAX_API_LAYER_NAME_SIZE],
        next_get_instance_proc_addr: get_instance_proc_addr,
        next_create_api_layer_instance: create_api_layer_instance,
        next: ptr::null_mut(),
    };
    fill(&mut next_info.layer_name, LAYER_NAME);
    let layer_info = ApiLayerCreateInfo {
        ty: LoaderInterfaceStruct::API_LAYER_CREATE_INFO,
        struct_version: API_LAYER_CREATE_INFO_STRUCT_VERSION,
        struct_size: std::mem::size_of::<ApiLayerCreateInfo>(),
        loader_instance: ptr::null(),
        settings_file_location: [0; API_LAYER_MAX_SETTINGS_PATH_SIZE],
        next_info: &mut next_info,
    };

    let mut instance = xr::Instance::from_raw(0);
    let result = unsafe { create(&info, &layer_info, &mut instance) };
    if result == xr::Result::SUCCESS {
        Ok(Layer { instance, gipa })
    } else {
        Err(result)
    }
}
