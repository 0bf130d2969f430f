//! Eye tracker backed by `XR_FB_eye_tracking_social`.

use std::ptr;
use std::sync::Arc;

use eyegaze_core::tracker::{self, EyeSample};
use eyegaze_core::{EyeTracker, TrackerKind, math};
use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use eyegaze_dispatch::{DispatchError, FunctionName};
use openxr_sys as xr;
use openxr_sys::pfn;
use parking_lot::Mutex;
use serde_json::json;

use crate::next::{self, check, next_fn};
use crate::state::LayerInstance;

#[derive(Clone, Copy)]
struct Started {
    eye_tracker: xr::EyeTrackerFB,
    view_space: xr::Space,
}

/// Fuses the per-eye gaze poses the runtime reports for a session.
pub(crate) struct SocialEyeTracker {
    create_eye_tracker: pfn::CreateEyeTrackerFB,
    get_eye_gazes: pfn::GetEyeGazesFB,
    create_reference_space: pfn::CreateReferenceSpace,
    started: Mutex<Option<Started>>,
}

/// Build the social tracker for `instance`. `None` when
/// `XR_FB_eye_tracking_social` is not enabled or its functions are missing.
pub(crate) fn social(instance: &LayerInstance) -> Option<Arc<dyn EyeTracker>> {
    // SAFETY: each pfn type matches its name.
    let resolved = unsafe { SocialEyeTracker::resolve(instance) };
    match resolved {
        Ok(tracker) => Some(Arc::new(tracker)),
        Err(err) => {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Warn, "social_tracker_unavailable")
                    .with_handle(instance.handle())
                    .with_details(json!({ "error": err.to_string() }))
            });
            None
        }
    }
}

impl SocialEyeTracker {
    unsafe fn resolve(instance: &LayerInstance) -> Result<Self, DispatchError> {
        // SAFETY: forwarded to the caller.
        unsafe {
            Ok(Self {
                create_eye_tracker: next_fn(instance, FunctionName::CreateEyeTrackerFB)?,
                get_eye_gazes: next_fn(instance, FunctionName::GetEyeGazesFB)?,
                create_reference_space: next_fn(instance, FunctionName::CreateReferenceSpace)?,
                started: Mutex::new(None),
            })
        }
    }

    fn begin(&self, session: xr::Session) -> Result<Started, DispatchError> {
        let create_info = xr::EyeTrackerCreateInfoFB {
            ty: xr::EyeTrackerCreateInfoFB::TYPE,
            next: ptr::null(),
        };
        let mut eye_tracker = xr::EyeTrackerFB::from_raw(0);
        // SAFETY: valid in/out structures for a live session.
        check(unsafe { (self.create_eye_tracker)(session, &create_info, &mut eye_tracker) })?;

        let space_info = xr::ReferenceSpaceCreateInfo {
            ty: xr::ReferenceSpaceCreateInfo::TYPE,
            next: ptr::null(),
            reference_space_type: xr::ReferenceSpaceType::VIEW,
            pose_in_reference_space: math::identity(),
        };
        let mut view_space = xr::Space::from_raw(0);
        // SAFETY: as above.
        check(unsafe { (self.create_reference_space)(session, &space_info, &mut view_space) })?;
        Ok(Started {
            eye_tracker,
            view_space,
        })
    }

    /// Both eyes at `time`, in view space.
    fn sample(&self, time: xr::Time) -> Option<[EyeSample; 2]> {
        let started = (*self.started.lock())?;
        let info = xr::EyeGazesInfoFB {
            ty: xr::EyeGazesInfoFB::TYPE,
            next: ptr::null(),
            base_space: started.view_space,
            time,
        };
        // SAFETY: all-zero is a valid EyeGazesFB.
        let mut gazes: xr::EyeGazesFB = unsafe { std::mem::zeroed() };
        gazes.ty = xr::EyeGazesFB::TYPE;
        // SAFETY: valid in/out structures for a live eye tracker.
        let result = unsafe { (self.get_eye_gazes)(started.eye_tracker, &info, &mut gazes) };
        if next::failed(result) {
            return None;
        }
        let eyes = gazes.gaze.map(|eye| EyeSample {
            is_valid: eye.is_valid == xr::TRUE,
            pose: eye.gaze_pose,
            confidence: eye.gaze_confidence,
        });
        trace::record(|| {
            TraceEntry::new(TraceLevel::Trace, "eye_tracker_fb").with_details(json!({
                "left_valid": eyes[0].is_valid,
                "left_confidence": eyes[0].confidence,
                "right_valid": eyes[1].is_valid,
                "right_confidence": eyes[1].confidence,
            }))
        });
        Some(eyes)
    }
}

impl EyeTracker for SocialEyeTracker {
    fn start(&self, session: u64) -> Result<(), xr::Result> {
        let started = self
            .begin(xr::Session::from_raw(session))
            .map_err(|err| err.to_xr_result())?;
        *self.started.lock() = Some(started);
        Ok(())
    }

    // The runtime destroys the eye tracker and view space with their session.
    fn stop(&self) {
        self.started.lock().take();
    }

    fn is_gaze_available(&self, time: xr::Time) -> bool {
        self.sample(time)
            .is_some_and(|[left, right]| tracker::eyes_usable(&left, &right))
    }

    fn gaze(&self, time: xr::Time) -> Option<xr::Vector3f> {
        let [left, right] = self.sample(time)?;
        tracker::fuse_social_gazes(&left, &right)
    }

    fn kind(&self) -> TrackerKind {
        TrackerKind::SocialFB
    }
}
