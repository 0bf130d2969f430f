//! Trampolines of the eye gaze interaction overrides.
//!
//! Each one finds its instance context, runs the policy from `eyegaze-core`
//! around at most one call into the next layer, and returns that call's
//! result unless the override answers by itself.

use std::ffi::{CString, c_char};
use std::ptr;
use std::sync::Arc;

use eyegaze_core::gaze::{self, LocatePlan};
use eyegaze_core::{SessionGaze, SystemProbe, math};
use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use eyegaze_dispatch::{DispatchError, ExtensionName, FunctionName, SessionContext, VoidFunction};
use openxr_sys as xr;
use openxr_sys::pfn;
use serde_json::json;

use crate::entry;
use crate::next::{self, check, fixed_str, next_fn};
use crate::state::{self, LayerInstance};
use crate::trackers;

/// Room for any path string (`XR_MAX_PATH_LENGTH`).
const PATH_CAPACITY: usize = 256;

/// Trampoline for `name`, if the layer has one.
#[must_use]
pub fn trampoline(name: FunctionName) -> Option<VoidFunction> {
    use FunctionName as F;
    Some(match name {
        F::GetInstanceProcAddr => void_fn!(entry::xr_get_instance_proc_addr as pfn::GetInstanceProcAddr),
        F::DestroyInstance => void_fn!(entry::xr_destroy_instance as pfn::DestroyInstance),
        F::GetSystem => void_fn!(xr_get_system as pfn::GetSystem),
        F::GetSystemProperties => void_fn!(xr_get_system_properties as pfn::GetSystemProperties),
        F::SuggestInteractionProfileBindings => void_fn!(
            xr_suggest_interaction_profile_bindings as pfn::SuggestInteractionProfileBindings
        ),
        F::CreateSession => void_fn!(xr_create_session as pfn::CreateSession),
        F::DestroySession => void_fn!(xr_destroy_session as pfn::DestroySession),
        F::GetCurrentInteractionProfile => {
            void_fn!(xr_get_current_interaction_profile as pfn::GetCurrentInteractionProfile)
        }
        F::CreateActionSpace => void_fn!(xr_create_action_space as pfn::CreateActionSpace),
        F::DestroySpace => void_fn!(xr_destroy_space as pfn::DestroySpace),
        F::GetActionStatePose => void_fn!(xr_get_action_state_pose as pfn::GetActionStatePose),
        F::WaitFrame => void_fn!(xr_wait_frame as pfn::WaitFrame),
        F::BeginFrame => void_fn!(xr_begin_frame as pfn::BeginFrame),
        F::LocateSpace => void_fn!(xr_locate_space as pfn::LocateSpace),
        F::EnumerateBoundSourcesForAction => {
            void_fn!(xr_enumerate_bound_sources_for_action as pfn::EnumerateBoundSourcesForAction)
        }
        F::GetInputSourceLocalizedName => {
            void_fn!(xr_get_input_source_localized_name as pfn::GetInputSourceLocalizedName)
        }
        _ => return None,
    })
}

type Session = Arc<SessionContext<SessionGaze>>;

fn instance_context(instance: xr::Instance) -> Result<Arc<LayerInstance>, DispatchError> {
    state::runtime()?
        .contexts()
        .instance(instance.into_raw())
        .ok_or(DispatchError::UnknownHandle(instance.into_raw()))
}

/// Instance owning a session or space, and the session context if `handle`
/// is a session this layer saw created.
fn object_context(handle: u64) -> Result<(Arc<LayerInstance>, Option<Session>), DispatchError> {
    let contexts = state::runtime()?.contexts();
    if let Some((instance, session)) = contexts.session(handle) {
        return Ok((instance, Some(session)));
    }
    let instance = contexts
        .instance_for_object(handle)
        .ok_or(DispatchError::UnknownHandle(handle))?;
    Ok((instance, None))
}

/// Session created on the adopted system, with eye gaze not passed through.
fn handled_session(instance: &LayerInstance, session: Option<&Session>) -> Option<Session> {
    session
        .filter(|session| session.state().is_handled() && !instance.state().gaze.is_passthrough())
        .cloned()
}

fn instance_handle(instance: &LayerInstance) -> xr::Instance {
    xr::Instance::from_raw(instance.handle())
}

/// Text of `path`; `XR_NULL_PATH` is the empty string.
unsafe fn path_string(instance: &LayerInstance, path: xr::Path) -> Result<String, DispatchError> {
    if path.into_raw() == 0 {
        return Ok(String::new());
    }
    let path_to_string: pfn::PathToString = unsafe { next_fn(instance, FunctionName::PathToString)? };
    let mut buffer = [0 as c_char; PATH_CAPACITY];
    let mut count = 0u32;
    check(unsafe {
        path_to_string(
            instance_handle(instance),
            path,
            PATH_CAPACITY as u32,
            &mut count,
            buffer.as_mut_ptr(),
        )
    })?;
    Ok(fixed_str(&buffer[..(count as usize).min(PATH_CAPACITY)]))
}

unsafe fn string_to_path(instance: &LayerInstance, text: &str) -> Result<xr::Path, DispatchError> {
    let string_to_path: pfn::StringToPath = unsafe { next_fn(instance, FunctionName::StringToPath)? };
    let text = CString::new(text).map_err(|_| DispatchError::InvalidArgument("path"))?;
    let mut path = xr::Path::from_raw(0);
    check(unsafe { string_to_path(instance_handle(instance), text.as_ptr(), &mut path) })?;
    Ok(path)
}

/// What the layer below reports about `system_id`.
unsafe fn probe_system(instance: &LayerInstance, system_id: xr::SystemId) -> SystemProbe {
    let Ok(get_properties) = (unsafe {
        next_fn::<pfn::GetSystemProperties>(instance, FunctionName::GetSystemProperties)
    }) else {
        return SystemProbe::default();
    };
    // SAFETY: all-zero is a valid value for these output structures.
    let mut eye_gaze: xr::SystemEyeGazeInteractionPropertiesEXT = unsafe { std::mem::zeroed() };
    eye_gaze.ty = xr::SystemEyeGazeInteractionPropertiesEXT::TYPE;
    let mut eye_tracking: xr::SystemEyeTrackingPropertiesFB = unsafe { std::mem::zeroed() };
    eye_tracking.ty = xr::SystemEyeTrackingPropertiesFB::TYPE;
    eye_tracking.next = (&raw mut eye_gaze).cast();
    let mut properties: xr::SystemProperties = unsafe { std::mem::zeroed() };
    properties.ty = xr::SystemProperties::TYPE;
    properties.next = (&raw mut eye_tracking).cast();

    let result = unsafe { get_properties(instance_handle(instance), system_id, &mut properties) };
    if next::failed(result) {
        return SystemProbe::default();
    }
    SystemProbe {
        system_name: fixed_str(&properties.system_name),
        supports_eye_gaze_interaction: eye_gaze.supports_eye_gaze_interaction == xr::TRUE,
        supports_eye_tracking_fb: eye_tracking.supports_eye_tracking == xr::TRUE,
    }
}

layer_fn! {
    /// Adopt the head-mounted system and pick its eye tracker.
    fn xr_get_system(
        instance: xr::Instance,
        get_info: *const xr::SystemGetInfo,
        system_id: *mut xr::SystemId,
    ) as GetSystem {
        let context = instance_context(instance)?;
        let info = get_info
            .as_ref()
            .filter(|info| info.ty == xr::SystemGetInfo::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrSystemGetInfo"))?;
        let get_system: pfn::GetSystem = next_fn(&context, FunctionName::GetSystem)?;
        let result = check(get_system(instance, get_info, system_id))?;

        if info.form_factor == xr::FormFactor::HEAD_MOUNTED_DISPLAY {
            let id = *system_id;
            let social_enabled = context
                .extensions()
                .enabled()
                .contains(ExtensionName::EyeTrackingSocialFB);
            context.state().gaze.handle_system(
                id.into_raw(),
                || probe_system(&context, id),
                social_enabled,
                || trackers::social(&context),
            );
        }
        Ok(result)
    }
}

layer_fn! {
    /// Report eye gaze interaction support according to the selected tracker.
    fn xr_get_system_properties(
        instance: xr::Instance,
        system_id: xr::SystemId,
        properties: *mut xr::SystemProperties,
    ) as GetSystemProperties {
        if properties.is_null() {
            return Err(DispatchError::InvalidArgument("XrSystemProperties"));
        }
        let context = instance_context(instance)?;
        let get_properties: pfn::GetSystemProperties =
            next_fn(&context, FunctionName::GetSystemProperties)?;
        let result = check(get_properties(instance, system_id, properties))?;

        let gaze = &context.state().gaze;
        if gaze.is_system_handled(system_id.into_raw()) && !gaze.is_passthrough() {
            let supported = if gaze.supports_eye_gaze() { xr::TRUE } else { xr::FALSE };
            let mut next = (*properties).next.cast::<xr::BaseOutStructure>();
            while let Some(entry) = next.as_mut() {
                if entry.ty == xr::SystemEyeGazeInteractionPropertiesEXT::TYPE {
                    let eye_gaze = next.cast::<xr::SystemEyeGazeInteractionPropertiesEXT>();
                    (*eye_gaze).supports_eye_gaze_interaction = supported;
                    break;
                }
                next = entry.next;
            }
        }
        Ok(result)
    }
}

layer_fn! {
    /// Record the eye gaze profile's bindings instead of suggesting them below.
    fn xr_suggest_interaction_profile_bindings(
        instance: xr::Instance,
        suggested_bindings: *const xr::InteractionProfileSuggestedBinding,
    ) as SuggestInteractionProfileBindings {
        let context = instance_context(instance)?;
        let suggested = suggested_bindings
            .as_ref()
            .filter(|s| s.ty == xr::InteractionProfileSuggestedBinding::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrInteractionProfileSuggestedBinding"))?;

        let profile = path_string(&context, suggested.interaction_profile)?;
        if !context.state().gaze.is_passthrough() && profile == gaze::EYE_GAZE_PROFILE {
            let bindings: &[xr::ActionSuggestedBinding] =
                if suggested.suggested_bindings.is_null() {
                    &[]
                } else {
                    std::slice::from_raw_parts(
                        suggested.suggested_bindings,
                        suggested.count_suggested_bindings as usize,
                    )
                };
            let mut resolved = Vec::with_capacity(bindings.len());
            for binding in bindings {
                resolved.push((binding.action.into_raw(), path_string(&context, binding.binding)?));
            }
            let matched = context
                .state()
                .gaze
                .actions()
                .record_bindings(resolved.iter().map(|(action, path)| (*action, path.as_str())));
            trace::record(|| {
                TraceEntry::new(TraceLevel::Info, "eye_gaze_bindings")
                    .with_handle(instance.into_raw())
                    .with_details(json!({ "bindings": resolved.len(), "eye_gaze": matched }))
            });
            return Ok(xr::Result::SUCCESS);
        }

        let suggest: pfn::SuggestInteractionProfileBindings =
            next_fn(&context, FunctionName::SuggestInteractionProfileBindings)?;
        check(suggest(instance, suggested_bindings))
    }
}

layer_fn! {
    /// Register the session; on the adopted system, start the tracker and
    /// create the view space gaze poses are composed with.
    fn xr_create_session(
        instance: xr::Instance,
        create_info: *const xr::SessionCreateInfo,
        session: *mut xr::Session,
    ) as CreateSession {
        let context = instance_context(instance)?;
        let info = create_info
            .as_ref()
            .filter(|info| info.ty == xr::SessionCreateInfo::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrSessionCreateInfo"))?;
        let create: pfn::CreateSession = next_fn(&context, FunctionName::CreateSession)?;
        let result = check(create(instance, create_info, session))?;

        let handle = *session;
        let gaze = &context.state().gaze;
        let handled = gaze.is_system_handled(info.system_id.into_raw());
        let inserted = state::runtime()?.contexts().insert_session(
            instance.into_raw(),
            handle.into_raw(),
            SessionGaze::new(handled),
        );
        let registered = match inserted {
            Ok(registered) => registered,
            Err(err) => {
                destroy_session_below(&context, handle);
                return Err(err);
            }
        };
        if handled {
            if let Some(tracker) = gaze.tracker()
                && let Err(err) = tracker.start(handle.into_raw())
            {
                trace::record(|| {
                    TraceEntry::new(TraceLevel::Warn, "tracker_start_failed")
                        .with_handle(handle.into_raw())
                        .with_result(err.into_raw())
                });
            }
            match create_view_space(&context, handle) {
                Ok(view) => registered.state().set_view_space(view.into_raw()),
                Err(err) => trace::record(|| {
                    TraceEntry::new(TraceLevel::Warn, "view_space_failed")
                        .with_handle(handle.into_raw())
                        .with_details(json!({ "error": err.to_string() }))
                }),
            }
        }
        let tracker_kind = gaze.tracker_kind();
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "session_created")
                .with_handle(handle.into_raw())
                .with_details(json!({ "handled": handled, "tracker": tracker_kind }))
        });
        Ok(result)
    }
}

unsafe fn destroy_session_below(instance: &LayerInstance, session: xr::Session) {
    // SAFETY: the signature matches the name.
    if let Ok(destroy) =
        unsafe { next_fn::<pfn::DestroySession>(instance, FunctionName::DestroySession) }
    {
        // SAFETY: `session` was just created by the next layer.
        let _ = unsafe { destroy(session) };
    }
}

unsafe fn create_view_space(
    instance: &LayerInstance,
    session: xr::Session,
) -> Result<xr::Space, DispatchError> {
    let create: pfn::CreateReferenceSpace =
        unsafe { next_fn(instance, FunctionName::CreateReferenceSpace)? };
    let info = xr::ReferenceSpaceCreateInfo {
        ty: xr::ReferenceSpaceCreateInfo::TYPE,
        next: ptr::null(),
        reference_space_type: xr::ReferenceSpaceType::VIEW,
        pose_in_reference_space: math::identity(),
    };
    let mut space = xr::Space::from_raw(0);
    check(unsafe { create(session, &info, &mut space) })?;
    Ok(space)
}

layer_fn! {
    /// Release the session's state, then destroy it below. Only the call that
    /// removes the session forwards.
    fn xr_destroy_session(session: xr::Session) as DestroySession {
        let (context, removed) = state::runtime()?
            .contexts()
            .remove_session(session.into_raw())
            .ok_or(DispatchError::UnknownHandle(session.into_raw()))?;
        let gaze = &context.state().gaze;
        if removed.state().is_handled()
            && let Some(tracker) = gaze.tracker()
        {
            tracker.stop();
        }
        let destroyed = removed.state().lifecycle().destroyed();
        if let Err(err) = destroyed {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Warn, "lifecycle_rejected")
                    .with_handle(session.into_raw())
                    .with_details(json!({ "error": err.to_string() }))
            });
        }
        let spaces = gaze.actions().remove_session_spaces(session.into_raw());
        let contexts = state::runtime()?.contexts();
        for space in &spaces {
            contexts.untrack_object(*space);
        }

        let destroy: pfn::DestroySession = next_fn(&context, FunctionName::DestroySession)?;
        check(destroy(session))
    }
}

layer_fn! {
    /// Answer for `/user/eyes_ext` with the eye gaze interaction profile.
    fn xr_get_current_interaction_profile(
        session: xr::Session,
        top_level_user_path: xr::Path,
        interaction_profile: *mut xr::InteractionProfileState,
    ) as GetCurrentInteractionProfile {
        let state = interaction_profile
            .as_mut()
            .filter(|state| state.ty == xr::InteractionProfileState::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrInteractionProfileState"))?;
        let (context, registered) = object_context(session.into_raw())?;
        if handled_session(&context, registered.as_ref()).is_some()
            && path_string(&context, top_level_user_path)? == gaze::EYES_USER_PATH
        {
            state.interaction_profile = string_to_path(&context, gaze::EYE_GAZE_PROFILE)?;
            return Ok(xr::Result::SUCCESS);
        }
        let get_profile: pfn::GetCurrentInteractionProfile =
            next_fn(&context, FunctionName::GetCurrentInteractionProfile)?;
        check(get_profile(session, top_level_user_path, interaction_profile))
    }
}

layer_fn! {
    /// Remember action spaces created on the adopted system.
    fn xr_create_action_space(
        session: xr::Session,
        create_info: *const xr::ActionSpaceCreateInfo,
        space: *mut xr::Space,
    ) as CreateActionSpace {
        let info = create_info
            .as_ref()
            .filter(|info| info.ty == xr::ActionSpaceCreateInfo::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrActionSpaceCreateInfo"))?;
        let (context, registered) = object_context(session.into_raw())?;
        let create: pfn::CreateActionSpace = next_fn(&context, FunctionName::CreateActionSpace)?;
        let result = check(create(session, create_info, space))?;

        if handled_session(&context, registered.as_ref()).is_some() {
            let handle = (*space).into_raw();
            context.state().gaze.actions().insert_space(
                handle,
                session.into_raw(),
                info.action.into_raw(),
                info.pose_in_action_space,
            );
            state::runtime()?.contexts().track_object(context.handle(), handle);
        }
        Ok(result)
    }
}

layer_fn! {
    /// Forget a remembered action space, then destroy it below.
    fn xr_destroy_space(space: xr::Space) as DestroySpace {
        let (context, _) = object_context(space.into_raw())?;
        if context.state().gaze.actions().remove_space(space.into_raw()) {
            state::runtime()?.contexts().untrack_object(space.into_raw());
        }
        let destroy: pfn::DestroySpace = next_fn(&context, FunctionName::DestroySpace)?;
        check(destroy(space))
    }
}

layer_fn! {
    /// Eye gaze actions are active while the tracker has a gaze.
    fn xr_get_action_state_pose(
        session: xr::Session,
        get_info: *const xr::ActionStateGetInfo,
        state: *mut xr::ActionStatePose,
    ) as GetActionStatePose {
        let info = get_info
            .as_ref()
            .filter(|info| info.ty == xr::ActionStateGetInfo::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrActionStateGetInfo"))?;
        let pose_state = state
            .as_mut()
            .filter(|state| state.ty == xr::ActionStatePose::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrActionStatePose"))?;
        let (context, registered) = object_context(session.into_raw())?;

        if let Some(handled) = handled_session(&context, registered.as_ref()) {
            let gaze = &context.state().gaze;
            let is_eye_gaze = gaze.actions().is_eye_gaze_action(info.action.into_raw());
            if is_eye_gaze {
                let active = gaze.gaze_available(handled.state().frames().last_begun());
                pose_state.is_active = if active { xr::TRUE } else { xr::FALSE };
                return Ok(xr::Result::SUCCESS);
            }
        }
        let get_state: pfn::GetActionStatePose = next_fn(&context, FunctionName::GetActionStatePose)?;
        check(get_state(session, get_info, state))
    }
}

layer_fn! {
    /// Remember the predicted display time of the waited frame.
    fn xr_wait_frame(
        session: xr::Session,
        frame_wait_info: *const xr::FrameWaitInfo,
        frame_state: *mut xr::FrameState,
    ) as WaitFrame {
        let (context, registered) = object_context(session.into_raw())?;
        let wait: pfn::WaitFrame = next_fn(&context, FunctionName::WaitFrame)?;
        let result = check(wait(session, frame_wait_info, frame_state))?;
        if let Some(registered) = registered.filter(|s| s.state().is_handled())
            && let Some(frame) = frame_state.as_ref()
        {
            registered.state().frames().frame_waited(frame.predicted_display_time);
        }
        Ok(result)
    }
}

layer_fn! {
    /// Promote the last waited frame to the last begun frame.
    fn xr_begin_frame(
        session: xr::Session,
        frame_begin_info: *const xr::FrameBeginInfo,
    ) as BeginFrame {
        let (context, registered) = object_context(session.into_raw())?;
        let begin: pfn::BeginFrame = next_fn(&context, FunctionName::BeginFrame)?;
        let result = check(begin(session, frame_begin_info))?;
        if let Some(registered) = registered.filter(|s| s.state().is_handled()) {
            let gaze_state = registered.state();
            gaze_state.frames().frame_begun();
            if let Err(err) = gaze_state.lifecycle().frame_begun() {
                trace::record(|| {
                    TraceEntry::new(TraceLevel::Warn, "lifecycle_rejected")
                        .with_handle(session.into_raw())
                        .with_details(json!({ "error": err.to_string() }))
                });
            }
        }
        Ok(result)
    }
}

layer_fn! {
    /// Locate eye gaze spaces from the tracker's gaze and the view pose.
    fn xr_locate_space(
        space: xr::Space,
        base_space: xr::Space,
        time: xr::Time,
        location: *mut xr::SpaceLocation,
    ) as LocateSpace {
        let out = location
            .as_mut()
            .filter(|location| location.ty == xr::SpaceLocation::TYPE)
            .ok_or(DispatchError::InvalidArgument("XrSpaceLocation"))?;
        let (context, _) = object_context(space.into_raw())
            .or_else(|_| object_context(base_space.into_raw()))?;
        let locate: pfn::LocateSpace = next_fn(&context, FunctionName::LocateSpace)?;

        let plan = context
            .state()
            .gaze
            .actions()
            .plan_locate(space.into_raw(), base_space.into_raw());
        match plan {
            LocatePlan::Forward => check(locate(space, base_space, time, location)),
            LocatePlan::BothGaze { pose } => {
                out.pose = pose;
                out.location_flags = math::fully_tracked();
                Ok(xr::Result::SUCCESS)
            }
            LocatePlan::OneGaze {
                offset,
                session,
                other,
                base_is_gaze,
            } => {
                out.location_flags = xr::SpaceLocationFlags::EMPTY;
                let view_space = state::runtime()?
                    .contexts()
                    .session(session)
                    .and_then(|(_, registered)| registered.state().view_space());
                let Some(view_space) = view_space else {
                    return Ok(xr::Result::SUCCESS);
                };
                let Some(gaze) = context.state().gaze.sample_gaze(time) else {
                    return Ok(xr::Result::SUCCESS);
                };
                // SAFETY: all-zero is a valid SpaceLocation.
                let mut view_in_other: xr::SpaceLocation = std::mem::zeroed();
                view_in_other.ty = xr::SpaceLocation::TYPE;
                check(locate(
                    xr::Space::from_raw(view_space),
                    xr::Space::from_raw(other),
                    time,
                    &mut view_in_other,
                ))?;
                if math::is_pose_valid(view_in_other.location_flags) {
                    out.pose =
                        gaze::compose_gaze_location(gaze, offset, view_in_other.pose, base_is_gaze);
                    out.location_flags = view_in_other.location_flags;
                }
                Ok(xr::Result::SUCCESS)
            }
        }
    }
}

layer_fn! {
    fn xr_enumerate_bound_sources_for_action(
        session: xr::Session,
        enumerate_info: *const xr::BoundSourcesForActionEnumerateInfo,
        source_capacity_input: u32,
        source_count_output: *mut u32,
        sources: *mut xr::Path,
    ) as EnumerateBoundSourcesForAction {
        let (context, _) = object_context(session.into_raw())?;
        let enumerate: pfn::EnumerateBoundSourcesForAction =
            next_fn(&context, FunctionName::EnumerateBoundSourcesForAction)?;
        check(enumerate(
            session,
            enumerate_info,
            source_capacity_input,
            source_count_output,
            sources,
        ))
    }
}

layer_fn! {
    fn xr_get_input_source_localized_name(
        session: xr::Session,
        get_info: *const xr::InputSourceLocalizedNameGetInfo,
        buffer_capacity_input: u32,
        buffer_count_output: *mut u32,
        buffer: *mut c_char,
    ) as GetInputSourceLocalizedName {
        let (context, _) = object_context(session.into_raw())?;
        let get_name: pfn::GetInputSourceLocalizedName =
            next_fn(&context, FunctionName::GetInputSourceLocalizedName)?;
        check(get_name(
            session,
            get_info,
            buffer_capacity_input,
            buffer_count_output,
            buffer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyegaze_dispatch::{DispatchTable, ManifestVariant};

    #[test]
    fn every_override_has_a_trampoline() {
        for variant in ManifestVariant::ALL {
            let manifest = variant.manifest();
            let table = DispatchTable::build(&manifest, &trampoline).unwrap();
            for name in manifest.override_functions().iter() {
                assert!(table.trampoline(name).is_some(), "{name} has no trampoline");
            }
        }
    }

    #[test]
    fn requested_only_functions_have_no_trampoline() {
        assert!(trampoline(FunctionName::CreateReferenceSpace).is_none());
        assert!(trampoline(FunctionName::GetEyeGazesFB).is_none());
        assert!(trampoline(FunctionName::DestroyInstance).is_some());
    }
}
