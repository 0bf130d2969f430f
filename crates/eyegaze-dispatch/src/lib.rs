//! # eyegaze-dispatch
//!
//! Dispatch core for a layered, function-table based runtime API (OpenXR).
//!
//! A layer sits between the application (or the layer above) and the next
//! implementation in the chain. This crate owns the machinery every such layer
//! needs, independent of what the overrides actually do:
//!
//! ```text
//! caller -> xrGetInstanceProcAddr -> DispatchTable --trampoline--> override logic --+
//!                                         |                                          |
//!                                         +--pass-through--> NextLayerTable <--------+
//!                                                                 |
//!                                                          next layer's GIPA
//! ```
//!
//! - [`FunctionName`] / [`ExtensionName`]: closed catalogues of the entry points
//!   and extensions this build knows, with array-indexed sets over them.
//! - [`LayerManifest`]: the validated override/request/extension lists.
//! - [`ExtensionRegistry`]: `declared ∩ available_below` negotiation.
//! - [`NextLayerTable`]: resolve-once cells in front of the next layer's lookup.
//! - [`DispatchTable`]: immutable name -> route table built at startup.
//! - [`ContextRegistry`]: instance/session contexts keyed by handle.
//! - [`LayerRuntime`]: wires the above together for the loader boundary.

pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod extension;
pub mod function;
pub mod manifest;
pub mod resolve;
pub mod routing;
pub mod trace;

pub use context::{ContextRegistry, InstanceContext, SessionContext};
pub use entry::{LayerRuntime, ProcRoute};
pub use error::{DispatchError, ManifestError};
pub use extension::{ExtensionName, ExtensionRegistry, ExtensionSet, ExtensionState};
pub use function::{FunctionName, FunctionSet};
pub use manifest::{LayerManifest, ManifestList, ManifestVariant};
pub use resolve::{NextLayerTable, ProcResolver, Resolution, VoidFunction};
pub use routing::{DispatchTable, Route, RoutePlanEntry, TrampolineProvider};

/// Name under which the layer registers with the loader.
pub const LAYER_NAME: &str = "XR_APILAYER_NOVENDOR_eyegaze";
