//! Override dispatch table.
//!
//! Built once per layer runtime from the manifest and the set of trampolines
//! the boundary crate provides, then only read.

use serde::Serialize;

use crate::error::DispatchError;
use crate::function::{FunctionName, FunctionSet};
use crate::manifest::LayerManifest;
use crate::resolve::VoidFunction;

/// Entry points the layer must always answer itself, whatever the manifest
/// says: the loader hands these out before any override runs.
pub const ENTRY_POINTS: &[FunctionName] =
    &[FunctionName::GetInstanceProcAddr, FunctionName::DestroyInstance];

/// Where a catalogued name goes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Handled by this layer.
    Trampoline(VoidFunction),
    /// Resolved on the layer below.
    PassThrough,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trampoline(ptr) => write!(f, "Trampoline({:#x})", *ptr as usize),
            Self::PassThrough => f.write_str("PassThrough"),
        }
    }
}

/// Source of trampolines, keyed by catalogued name.
pub trait TrampolineProvider {
    fn trampoline(&self, name: FunctionName) -> Option<VoidFunction>;
}

impl<F> TrampolineProvider for F
where
    F: Fn(FunctionName) -> Option<VoidFunction>,
{
    fn trampoline(&self, name: FunctionName) -> Option<VoidFunction> {
        self(name)
    }
}

/// One row of [`DispatchTable::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePlanEntry {
    pub function: FunctionName,
    pub route: &'static str,
    pub requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<crate::extension::ExtensionName>,
}

/// Immutable name -> route table.
#[derive(Debug)]
pub struct DispatchTable {
    routes: [Route; FunctionName::COUNT],
    overrides: FunctionSet,
    requested: FunctionSet,
}

impl DispatchTable {
    /// Route every overridden name (plus [`ENTRY_POINTS`]) to its trampoline.
    ///
    /// Fails if the provider has no trampoline for one of them.
    pub fn build(
        manifest: &LayerManifest,
        provider: &dyn TrampolineProvider,
    ) -> Result<Self, DispatchError> {
        let mut routes = [Route::PassThrough; FunctionName::COUNT];
        let handled = manifest
            .override_functions()
            .union(FunctionSet::from_slice(ENTRY_POINTS));
        for name in handled.iter() {
            let f = provider
                .trampoline(name)
                .ok_or(DispatchError::MissingTrampoline(name))?;
            routes[name.index()] = Route::Trampoline(f);
        }
        Ok(Self {
            routes,
            overrides: manifest.override_functions(),
            requested: manifest.requested_functions(),
        })
    }

    #[must_use]
    pub fn route(&self, name: FunctionName) -> Route {
        self.routes[name.index()]
    }

    #[must_use]
    pub fn trampoline(&self, name: FunctionName) -> Option<VoidFunction> {
        match self.routes[name.index()] {
            Route::Trampoline(f) => Some(f),
            Route::PassThrough => None,
        }
    }

    /// Overridden names from the manifest (entry points excluded).
    #[must_use]
    pub fn overrides(&self) -> FunctionSet {
        self.overrides
    }

    /// Route of every catalogued name, in catalogue order.
    #[must_use]
    pub fn plan(&self) -> Vec<RoutePlanEntry> {
        FunctionName::ALL
            .iter()
            .map(|&function| RoutePlanEntry {
                function,
                route: match self.route(function) {
                    Route::Trampoline(_) => "trampoline",
                    Route::PassThrough => "pass_through",
                },
                requested: self.requested.contains(function),
                extension: function.owning_extension(),
            })
            .collect()
    }
}
