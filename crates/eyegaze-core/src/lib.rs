//! # eyegaze-core
//!
//! Safe implementation of the eye gaze interaction overrides.
//!
//! Everything here works on plain values handed over by the boundary crate:
//! pose math, eye tracker selection and fusion, the action/space bookkeeping
//! behind `xrLocateSpace`, and the per-session lifecycle. No `unsafe` code is
//! permitted at the crate level.

#![deny(unsafe_code)]

pub mod gaze;
pub mod lifecycle;
pub mod math;
pub mod state;
pub mod tracker;

pub use gaze::{ActionTable, LocatePlan};
pub use lifecycle::{LifecycleError, SessionLifecycle, SessionPhase};
pub use state::{FrameClock, InstanceGaze, SessionGaze};
pub use tracker::{EyeSample, EyeTracker, SimulatedEyeTracker, SystemProbe, TrackerKind};
