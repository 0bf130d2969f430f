//! Eye trackers and tracker selection.

use std::fmt;

use openxr_sys as xr;
use serde::Serialize;

use crate::math;

/// Where gaze samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// No eye tracking available.
    None,
    /// The layer below implements eye gaze interaction; this layer stays out
    /// of the way.
    Passthrough,
    /// Fixed configurable gaze point.
    Simulated,
    /// Per-eye poses from `XR_FB_eye_tracking_social`.
    SocialFB,
}

impl TrackerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Passthrough => "Passthrough",
            Self::Simulated => "Simulated",
            Self::SocialFB => "Social eye tracking (FB)",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of gaze directions.
///
/// Implementations use interior mutability: trackers are shared between the
/// instance (which selects them) and the session trampolines that sample them.
pub trait EyeTracker: Send + Sync {
    /// Begin sampling for `session`.
    fn start(&self, session: u64) -> Result<(), xr::Result>;
    fn stop(&self);
    /// Whether a sample at `time` would be usable, without computing it.
    fn is_gaze_available(&self, time: xr::Time) -> bool;
    /// Unit gaze direction in view space at `time`.
    fn gaze(&self, time: xr::Time) -> Option<xr::Vector3f>;
    fn kind(&self) -> TrackerKind;
}

/// Tracker looking at a fixed point of a unit square laid over the view.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedEyeTracker {
    point: (f32, f32),
}

/// Depth of the virtual plane the simulated point lies on.
const SIMULATED_PLANE_DEPTH: f32 = 0.35;

impl SimulatedEyeTracker {
    /// `point` is in `[0,1]²`, origin top-left, `(0.5, 0.5)` straight ahead.
    #[must_use]
    pub fn new(point: (f32, f32)) -> Self {
        Self { point }
    }

    #[must_use]
    pub fn direction(&self) -> xr::Vector3f {
        let (x, y) = self.point;
        math::normalize(math::vec3(x - 0.5, 0.5 - y, -SIMULATED_PLANE_DEPTH))
    }
}

impl EyeTracker for SimulatedEyeTracker {
    fn start(&self, _session: u64) -> Result<(), xr::Result> {
        Ok(())
    }

    fn stop(&self) {}

    fn is_gaze_available(&self, _time: xr::Time) -> bool {
        true
    }

    fn gaze(&self, _time: xr::Time) -> Option<xr::Vector3f> {
        Some(self.direction())
    }

    fn kind(&self) -> TrackerKind {
        TrackerKind::Simulated
    }
}

/// One eye of a social eye tracking sample.
#[derive(Debug, Clone, Copy)]
pub struct EyeSample {
    pub is_valid: bool,
    pub pose: xr::Posef,
    pub confidence: f32,
}

/// Minimum per-eye confidence for a fused sample.
pub const MIN_EYE_CONFIDENCE: f32 = 0.5;

/// Both eyes valid and confident.
#[must_use]
pub fn eyes_usable(left: &EyeSample, right: &EyeSample) -> bool {
    left.is_valid
        && right.is_valid
        && left.confidence > MIN_EYE_CONFIDENCE
        && right.confidence > MIN_EYE_CONFIDENCE
}

/// Average both eye poses and project the forward axis through the result.
#[must_use]
pub fn fuse_social_gazes(left: &EyeSample, right: &EyeSample) -> Option<xr::Vector3f> {
    if !eyes_usable(left, right) {
        return None;
    }
    let gaze = math::slerp_pose(left.pose, right.pose, 0.5);
    Some(math::normalize(math::transform_point(gaze, math::FORWARD)))
}

/// What the layer below reports about a head-mounted system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemProbe {
    pub system_name: String,
    pub supports_eye_gaze_interaction: bool,
    pub supports_eye_tracking_fb: bool,
}

impl SystemProbe {
    /// Systems that advertise eye gaze interaction without a real tracker
    /// behind it on desktop.
    #[must_use]
    pub fn advertises_fake_eye_gaze(&self) -> bool {
        self.system_name.contains("Windows Mixed Reality")
    }

    /// Pick the tracker for this system.
    ///
    /// `simulate` comes from configuration; `social_enabled` says whether
    /// `XR_FB_eye_tracking_social` was negotiated for the instance.
    #[must_use]
    pub fn select(&self, simulate: bool, social_enabled: bool) -> TrackerKind {
        if self.supports_eye_gaze_interaction && !self.advertises_fake_eye_gaze() {
            TrackerKind::Passthrough
        } else if simulate {
            TrackerKind::Simulated
        } else if self.supports_eye_tracking_fb && social_enabled {
            TrackerKind::SocialFB
        } else {
            TrackerKind::None
        }
    }
}
