//! Eye gaze action and space bookkeeping, and the pose composition behind
//! `xrLocateSpace`.

use std::collections::{HashMap, HashSet};

use openxr_sys as xr;

use crate::math;

/// Interaction profile of `XR_EXT_eye_gaze_interaction`.
pub const EYE_GAZE_PROFILE: &str = "/interaction_profiles/ext/eye_gaze_interaction";

/// Top-level user path of the eyes.
pub const EYES_USER_PATH: &str = "/user/eyes_ext";

/// Binding paths that bind an action to the gaze pose.
pub const GAZE_POSE_PATHS: &[&str] = &[
    "/user/eyes_ext/input/gaze_ext/pose",
    "/user/eyes_ext/input/gaze_ext",
];

#[must_use]
pub fn is_gaze_binding(path: &str) -> bool {
    GAZE_POSE_PATHS.contains(&path)
}

#[derive(Debug, Clone, Copy)]
struct ActionSpace {
    action: u64,
    session: u64,
    offset: xr::Posef,
    is_eye_gaze: Option<bool>,
}

/// What `xrLocateSpace` should do for a pair of spaces.
#[derive(Debug, Clone, Copy)]
pub enum LocatePlan {
    /// Neither space is a gaze space.
    Forward,
    /// Both are gaze spaces: answer with their relative offset.
    BothGaze { pose: xr::Posef },
    /// Exactly one is a gaze space.
    OneGaze {
        /// Offset of the gaze space.
        offset: xr::Posef,
        /// Session the gaze space was created in.
        session: u64,
        /// The other space, in which the view is located.
        other: u64,
        /// Whether the gaze space is the base space.
        base_is_gaze: bool,
    },
}

/// Eye gaze actions of an instance and the action spaces created from them.
///
/// Whether a space is a gaze space is decided on its first use and then
/// memoized, so bindings suggested afterwards do not change it.
#[derive(Debug, Default)]
pub struct ActionTable {
    eye_gaze_actions: HashSet<u64>,
    spaces: HashMap<u64, ActionSpace>,
}

impl ActionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every action bound to a gaze pose path. Returns how many
    /// bindings matched.
    pub fn record_bindings<'a>(
        &mut self,
        bindings: impl IntoIterator<Item = (u64, &'a str)>,
    ) -> usize {
        let mut matched = 0;
        for (action, path) in bindings {
            if is_gaze_binding(path) {
                self.eye_gaze_actions.insert(action);
                matched += 1;
            }
        }
        matched
    }

    #[must_use]
    pub fn is_eye_gaze_action(&self, action: u64) -> bool {
        self.eye_gaze_actions.contains(&action)
    }

    #[must_use]
    pub fn eye_gaze_action_count(&self) -> usize {
        self.eye_gaze_actions.len()
    }

    /// Remember an action space (replacing a stale entry for a reused handle).
    pub fn insert_space(&mut self, space: u64, session: u64, action: u64, offset: xr::Posef) {
        self.spaces.insert(
            space,
            ActionSpace {
                action,
                session,
                offset,
                is_eye_gaze: None,
            },
        );
    }

    /// Forget an action space. Returns whether it was tracked.
    pub fn remove_space(&mut self, space: u64) -> bool {
        self.spaces.remove(&space).is_some()
    }

    #[must_use]
    pub fn is_tracked_space(&self, space: u64) -> bool {
        self.spaces.contains_key(&space)
    }

    /// Drop every space created in `session`.
    pub fn remove_session_spaces(&mut self, session: u64) -> Vec<u64> {
        let mut removed = Vec::new();
        self.spaces.retain(|&space, entry| {
            let keep = entry.session != session;
            if !keep {
                removed.push(space);
            }
            keep
        });
        removed
    }

    fn classify(&mut self, space: u64) -> Option<(xr::Posef, u64)> {
        let entry = self.spaces.get_mut(&space)?;
        let action = entry.action;
        let actions = &self.eye_gaze_actions;
        let is_eye_gaze = *entry
            .is_eye_gaze
            .get_or_insert_with(|| actions.contains(&action));
        is_eye_gaze.then_some((entry.offset, entry.session))
    }

    #[must_use]
    pub fn plan_locate(&mut self, space: u64, base_space: u64) -> LocatePlan {
        match (self.classify(space), self.classify(base_space)) {
            (None, None) => LocatePlan::Forward,
            (Some((query, _)), Some((base, _))) => LocatePlan::BothGaze {
                pose: relative_offset(query, base),
            },
            (Some((offset, session)), None) => LocatePlan::OneGaze {
                offset,
                session,
                other: base_space,
                base_is_gaze: false,
            },
            (None, Some((offset, session))) => LocatePlan::OneGaze {
                offset,
                session,
                other: space,
                base_is_gaze: true,
            },
        }
    }
}

/// Pose of one gaze space relative to another.
#[must_use]
pub fn relative_offset(query: xr::Posef, base: xr::Posef) -> xr::Posef {
    math::multiply(query, math::invert(base))
}

/// Rotation turning the view's forward axis towards `gaze`.
#[must_use]
pub fn gaze_rotation(gaze: xr::Vector3f) -> xr::Quaternionf {
    math::rotation_roll_pitch_yaw(gaze.y.tan(), -gaze.x.tan(), 0.0)
}

/// Location of a gaze space given the view's location in the other space.
///
/// With `base_is_gaze` the result is inverted, giving the other space in the
/// gaze space.
#[must_use]
pub fn compose_gaze_location(
    gaze: xr::Vector3f,
    offset: xr::Posef,
    view_in_other: xr::Posef,
    base_is_gaze: bool,
) -> xr::Posef {
    let gaze_in_view = math::make_pose(gaze_rotation(gaze), math::ORIGIN);
    let pose = math::multiply(math::multiply(gaze_in_view, offset), view_in_other);
    if base_is_gaze {
        math::invert(pose)
    } else {
        pose
    }
}
