//! Override state carried by instance and session contexts.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel};
use openxr_sys as xr;
use parking_lot::{Mutex, MutexGuard};
use serde_json::json;

use crate::gaze::ActionTable;
use crate::lifecycle::SessionLifecycle;
use crate::tracker::{EyeTracker, SimulatedEyeTracker, SystemProbe, TrackerKind};

struct SystemSelection {
    system_id: Option<u64>,
    kind: TrackerKind,
    tracker: Option<Arc<dyn EyeTracker>>,
}

/// Per-instance eye gaze state.
pub struct InstanceGaze {
    simulate: bool,
    simulated_point: (f32, f32),
    selection: Mutex<SystemSelection>,
    actions: Mutex<ActionTable>,
}

impl InstanceGaze {
    #[must_use]
    pub fn new(simulate: bool, simulated_point: (f32, f32)) -> Self {
        Self {
            simulate,
            simulated_point,
            selection: Mutex::new(SystemSelection {
                system_id: None,
                kind: TrackerKind::None,
                tracker: None,
            }),
            actions: Mutex::new(ActionTable::new()),
        }
    }

    /// Adopt `system_id` as the handled head-mounted system.
    ///
    /// The tracker is only re-selected when the system changes. `social`
    /// builds the social eye tracker when that is the selection.
    pub fn handle_system(
        &self,
        system_id: u64,
        probe: impl FnOnce() -> SystemProbe,
        social_enabled: bool,
        social: impl FnOnce() -> Option<Arc<dyn EyeTracker>>,
    ) -> TrackerKind {
        let mut selection = self.selection.lock();
        if selection.system_id == Some(system_id) {
            return selection.kind;
        }
        let probe = probe();
        let wanted = probe.select(self.simulate, social_enabled);
        let tracker: Option<Arc<dyn EyeTracker>> = match wanted {
            TrackerKind::Simulated => Some(Arc::new(SimulatedEyeTracker::new(self.simulated_point))),
            TrackerKind::SocialFB => social(),
            TrackerKind::None | TrackerKind::Passthrough => None,
        };
        let kind = match (&tracker, wanted) {
            (Some(tracker), _) => tracker.kind(),
            (None, TrackerKind::Passthrough) => TrackerKind::Passthrough,
            (None, _) => TrackerKind::None,
        };
        selection.system_id = Some(system_id);
        selection.kind = kind;
        selection.tracker = tracker;
        drop(selection);
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "tracker_selected").with_details(json!({
                "system_id": system_id,
                "system_name": probe.system_name,
                "supports_eye_gaze_interaction": probe.supports_eye_gaze_interaction,
                "supports_eye_tracking_fb": probe.supports_eye_tracking_fb,
                "tracker": kind,
            }))
        });
        kind
    }

    #[must_use]
    pub fn is_system_handled(&self, system_id: u64) -> bool {
        self.selection.lock().system_id == Some(system_id)
    }

    #[must_use]
    pub fn tracker_kind(&self) -> TrackerKind {
        self.selection.lock().kind
    }

    /// The layer below handles eye gaze interaction itself.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.tracker_kind() == TrackerKind::Passthrough
    }

    /// Value reported as `supportsEyeGazeInteraction`.
    #[must_use]
    pub fn supports_eye_gaze(&self) -> bool {
        self.tracker_kind() != TrackerKind::None
    }

    #[must_use]
    pub fn tracker(&self) -> Option<Arc<dyn EyeTracker>> {
        self.selection.lock().tracker.clone()
    }

    /// Action/space bookkeeping, under one lock.
    pub fn actions(&self) -> MutexGuard<'_, ActionTable> {
        self.actions.lock()
    }

    /// Gaze direction at `time`, if the tracker has one.
    #[must_use]
    pub fn sample_gaze(&self, time: xr::Time) -> Option<xr::Vector3f> {
        let gaze = self.tracker().and_then(|tracker| tracker.gaze(time));
        trace::record(|| {
            TraceEntry::new(TraceLevel::Trace, "eye_gaze").with_details(json!({
                "time": time.as_nanos(),
                "valid": gaze.is_some(),
                "gaze": gaze.map(|g| [g.x, g.y, g.z]),
            }))
        });
        gaze
    }

    /// Whether the tracker could produce a gaze at `time`.
    #[must_use]
    pub fn gaze_available(&self, time: xr::Time) -> bool {
        self.tracker()
            .is_some_and(|tracker| tracker.is_gaze_available(time))
    }
}

impl std::fmt::Debug for InstanceGaze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let selection = self.selection.lock();
        f.debug_struct("InstanceGaze")
            .field("system_id", &selection.system_id)
            .field("tracker", &selection.kind)
            .finish_non_exhaustive()
    }
}

/// Predicted display times of the last waited and last begun frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    waited: AtomicI64,
    begun: AtomicI64,
}

impl FrameClock {
    pub fn frame_waited(&self, predicted_display_time: xr::Time) {
        self.waited
            .store(predicted_display_time.as_nanos(), Ordering::Release);
    }

    /// Promote the last waited time to "last begun".
    pub fn frame_begun(&self) {
        self.begun
            .store(self.waited.load(Ordering::Acquire), Ordering::Release);
    }

    #[must_use]
    pub fn last_waited(&self) -> xr::Time {
        xr::Time::from_nanos(self.waited.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn last_begun(&self) -> xr::Time {
        xr::Time::from_nanos(self.begun.load(Ordering::Acquire))
    }
}

/// Per-session eye gaze state.
#[derive(Debug)]
pub struct SessionGaze {
    handled: bool,
    view_space: AtomicU64,
    frames: FrameClock,
    lifecycle: Mutex<SessionLifecycle>,
}

impl SessionGaze {
    /// State for a new session; `handled` sessions belong to the system this
    /// layer adopted.
    #[must_use]
    pub fn new(handled: bool) -> Self {
        let mut lifecycle = SessionLifecycle::new();
        let _ = lifecycle.created();
        Self {
            handled,
            view_space: AtomicU64::new(0),
            frames: FrameClock::default(),
            lifecycle: Mutex::new(lifecycle),
        }
    }

    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn set_view_space(&self, space: u64) {
        self.view_space.store(space, Ordering::Release);
    }

    #[must_use]
    pub fn view_space(&self) -> Option<u64> {
        match self.view_space.load(Ordering::Acquire) {
            0 => None,
            space => Some(space),
        }
    }

    #[must_use]
    pub fn frames(&self) -> &FrameClock {
        &self.frames
    }

    pub fn lifecycle(&self) -> MutexGuard<'_, SessionLifecycle> {
        self.lifecycle.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SessionPhase;
    use std::sync::atomic::AtomicUsize;

    fn probe(native: bool, fb: bool) -> impl FnOnce() -> SystemProbe {
        move || SystemProbe {
            system_name: "Test HMD".to_string(),
            supports_eye_gaze_interaction: native,
            supports_eye_tracking_fb: fb,
        }
    }

    #[test]
    fn simulated_tracker_is_built_when_configured() {
        let gaze = InstanceGaze::new(true, (0.5, 0.5));
        let kind = gaze.handle_system(3, probe(false, false), false, || None);
        assert_eq!(kind, TrackerKind::Simulated);
        assert!(gaze.is_system_handled(3));
        assert!(gaze.supports_eye_gaze());
        assert!(gaze.sample_gaze(xr::Time::from_nanos(1)).is_some());
    }

    #[test]
    fn same_system_is_not_probed_twice() {
        let gaze = InstanceGaze::new(false, (0.5, 0.5));
        let probes = AtomicUsize::new(0);
        for _ in 0..3 {
            gaze.handle_system(
                3,
                || {
                    probes.fetch_add(1, Ordering::SeqCst);
                    SystemProbe::default()
                },
                false,
                || None,
            );
        }
        assert_eq!(probes.load(Ordering::SeqCst), 1);
        assert_eq!(gaze.tracker_kind(), TrackerKind::None);
        assert!(!gaze.supports_eye_gaze());
        assert!(!gaze.gaze_available(xr::Time::from_nanos(0)));
    }

    #[test]
    fn native_support_means_passthrough() {
        let gaze = InstanceGaze::new(true, (0.5, 0.5));
        gaze.handle_system(1, probe(true, true), true, || None);
        assert!(gaze.is_passthrough());
        assert!(gaze.tracker().is_none());
    }

    #[test]
    fn failed_social_tracker_degrades_to_none() {
        let gaze = InstanceGaze::new(false, (0.5, 0.5));
        let kind = gaze.handle_system(1, probe(false, true), true, || None);
        assert_eq!(kind, TrackerKind::None);
    }

    #[test]
    fn begin_promotes_the_waited_time() {
        let clock = FrameClock::default();
        clock.frame_waited(xr::Time::from_nanos(100));
        assert_eq!(clock.last_begun(), xr::Time::from_nanos(0));
        clock.frame_begun();
        clock.frame_waited(xr::Time::from_nanos(200));
        assert_eq!(clock.last_begun(), xr::Time::from_nanos(100));
        assert_eq!(clock.last_waited(), xr::Time::from_nanos(200));
    }

    #[test]
    fn new_sessions_start_created() {
        let session = SessionGaze::new(true);
        assert_eq!(session.lifecycle().phase(), SessionPhase::Created);
        assert_eq!(session.view_space(), None);
        session.set_view_space(0x77);
        assert_eq!(session.view_space(), Some(0x77));
    }
}
