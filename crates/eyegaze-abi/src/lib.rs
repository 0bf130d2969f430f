// Every extern "system" entry point takes raw pointers from the loader or the
// application; the OpenXR valid-usage rules are the safety contract.
#![allow(clippy::missing_safety_doc)]
//! # eyegaze-abi
//!
//! OpenXR loader boundary of the eye-gaze API layer.
//!
//! This crate produces the `cdylib` the loader opens. It exports a single
//! symbol, `xrNegotiateLoaderApiLayerInterface`; everything else is handed out
//! through the layer's `xrGetInstanceProcAddr`.
//!
//! # Architecture
//!
//! ```text
//! loader -> negotiate -> xrCreateApiLayerInstance -> LayerRuntime::attach_instance
//! app -> xrGetInstanceProcAddr -> ProcRoute -> trampoline (this crate) -> eyegaze-core policy
//!                                        \--> next layer (cached in NextLayerTable)
//! ```
//!
//! The manifest variant is fixed at build time by the `social-eye-tracking`
//! feature.

#[macro_use]
mod macros;

pub mod entry;
pub mod loader;
mod next;
pub mod overrides;
mod state;
mod trackers;

pub use loader::{
    ApiLayerCreateInfo, ApiLayerNextInfo, LoaderInterfaceStruct, NegotiateApiLayerRequest,
    NegotiateLoaderInfo, xrNegotiateLoaderApiLayerInterface,
};
pub use state::{MANIFEST_VARIANT, shutdown};
