//! Layer runtime: the manifest, the dispatch table and the live contexts, as
//! seen from the loader boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

use crate::context::{ContextRegistry, InstanceContext};
use crate::error::DispatchError;
use crate::extension::{ExtensionRegistry, ExtensionSet};
use crate::function::FunctionName;
use crate::manifest::LayerManifest;
use crate::resolve::{NextLayerTable, ProcResolver, Resolution, VoidFunction};
use crate::routing::{DispatchTable, ENTRY_POINTS, Route, TrampolineProvider};
use crate::trace::{self, TraceEntry, TraceLevel};

/// Answer to an upward `xrGetInstanceProcAddr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcRoute {
    /// This layer's trampoline.
    Layer(VoidFunction),
    /// Cached outcome of resolving the name on the layer below.
    Next(Resolution),
    /// Not catalogued (or not declared by the manifest): ask the layer below
    /// directly, without caching.
    Forward,
}

/// Everything the loader boundary needs, generic over the per-instance (`I`)
/// and per-session (`S`) override state.
pub struct LayerRuntime<I, S> {
    manifest: LayerManifest,
    dispatch: DispatchTable,
    contexts: ContextRegistry<I, S>,
    shut_down: AtomicBool,
}

impl<I, S> LayerRuntime<I, S> {
    /// Build the dispatch table; fails if a trampoline is missing.
    pub fn new(
        manifest: LayerManifest,
        trampolines: &dyn TrampolineProvider,
    ) -> Result<Self, DispatchError> {
        let dispatch = DispatchTable::build(&manifest, trampolines)?;
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "dispatch_table_built").with_details(json!({
                "overrides": manifest.override_functions(),
                "requested": manifest.requested_functions(),
                "extensions": manifest.extensions(),
            }))
        });
        Ok(Self {
            manifest,
            dispatch,
            contexts: ContextRegistry::new(),
            shut_down: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn manifest(&self) -> &LayerManifest {
        &self.manifest
    }

    #[must_use]
    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextRegistry<I, S> {
        &self.contexts
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Wire a freshly created instance: negotiate extensions against what the
    /// layer below offers, bind a next-layer table, register the context.
    pub fn attach_instance(
        &self,
        handle: u64,
        resolver: impl ProcResolver + 'static,
        requested: ExtensionSet,
        available_below: ExtensionSet,
        bypass: bool,
        state: I,
    ) -> Result<Arc<InstanceContext<I, S>>, DispatchError> {
        if self.is_shut_down() {
            return Err(DispatchError::ShutDown);
        }
        let mut extensions = ExtensionRegistry::register(self.manifest.extensions());
        extensions.request(requested);
        let enabled = extensions.negotiate(available_below);
        for ext in self.manifest.extensions().iter() {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Info, "extension_negotiated")
                    .with_handle(handle)
                    .with_details(json!({
                        "extension": ext,
                        "state": extensions.state(ext),
                    }))
            });
        }
        let context = InstanceContext::new(
            handle,
            NextLayerTable::new(resolver),
            extensions,
            bypass,
            state,
        );
        let context = self.contexts.insert_instance(context);
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "instance_attached")
                .with_handle(handle)
                .with_details(json!({ "bypass": bypass, "enabled": enabled }))
        });
        Ok(context)
    }

    /// Forget an instance. `Some` only for the caller that removed it.
    pub fn detach_instance(&self, handle: u64) -> Option<Arc<InstanceContext<I, S>>> {
        let removed = self.contexts.remove_instance(handle);
        if removed.is_some() {
            trace::record(|| {
                TraceEntry::new(TraceLevel::Info, "instance_detached").with_handle(handle)
            });
        }
        removed
    }

    /// Decide where an upward lookup of `name` goes for `instance`.
    pub fn proc_route(&self, instance: &InstanceContext<I, S>, name: &str) -> ProcRoute {
        let Some(function) = FunctionName::from_name(name) else {
            return ProcRoute::Forward;
        };
        if ENTRY_POINTS.contains(&function)
            && let Some(f) = self.dispatch.trampoline(function)
        {
            return ProcRoute::Layer(f);
        }
        if instance.is_bypassed() {
            return ProcRoute::Next(instance.next().resolve(function, instance.extensions()));
        }
        if let Route::Trampoline(f) = self.dispatch.route(function) {
            return ProcRoute::Layer(f);
        }
        if let Some(ext) = function.owning_extension()
            && !self.manifest.declares(ext)
        {
            return ProcRoute::Forward;
        }
        ProcRoute::Next(instance.next().resolve(function, instance.extensions()))
    }

    /// Tear down every context. Returns how many instances were still live.
    pub fn shutdown(&self) -> usize {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let drained = self.contexts.drain().len();
        trace::record(|| {
            TraceEntry::new(TraceLevel::Info, "runtime_shutdown")
                .with_details(json!({ "live_instances": drained }))
        });
        drained
    }
}

impl<I, S> std::fmt::Debug for LayerRuntime<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRuntime")
            .field("manifest", &self.manifest)
            .field("instances", &self.contexts.instance_count())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionName;
    use crate::manifest::ManifestVariant;

    unsafe extern "system" fn trampoline_stub() {}
    unsafe extern "system" fn below_stub() {}

    fn runtime() -> LayerRuntime<(), ()> {
        LayerRuntime::new(ManifestVariant::EyeGaze.manifest(), &|_: FunctionName| {
            Some(trampoline_stub as VoidFunction)
        })
        .unwrap()
    }

    fn below(_: FunctionName) -> Option<VoidFunction> {
        Some(below_stub as VoidFunction)
    }

    #[test]
    fn overridden_names_route_to_the_layer() {
        let rt = runtime();
        let ctx = rt
            .attach_instance(1, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
            .unwrap();
        assert!(matches!(rt.proc_route(&ctx, "xrLocateSpace"), ProcRoute::Layer(_)));
        match rt.proc_route(&ctx, "xrEndFrame") {
            ProcRoute::Next(Resolution::Resolved(f)) => assert_eq!(f as usize, below_stub as usize),
            other => panic!("unexpected route {other:?}"),
        }
        assert_eq!(rt.proc_route(&ctx, "xrCreateSwapchain"), ProcRoute::Forward);
    }

    #[test]
    fn bypassed_instances_only_keep_entry_points() {
        let rt = runtime();
        let ctx = rt
            .attach_instance(1, below, ExtensionSet::empty(), ExtensionSet::empty(), true, ())
            .unwrap();
        assert!(matches!(rt.proc_route(&ctx, "xrLocateSpace"), ProcRoute::Next(_)));
        assert!(matches!(
            rt.proc_route(&ctx, "xrGetInstanceProcAddr"),
            ProcRoute::Layer(_)
        ));
        assert!(matches!(rt.proc_route(&ctx, "xrDestroyInstance"), ProcRoute::Layer(_)));
    }

    #[test]
    fn undeclared_extension_functions_are_forwarded() {
        let rt = runtime();
        let ctx = rt
            .attach_instance(1, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
            .unwrap();
        assert!(!rt.manifest().declares(ExtensionName::EyeTrackingSocialFB));
        assert_eq!(rt.proc_route(&ctx, "xrGetEyeGazesFB"), ProcRoute::Forward);
    }

    #[test]
    fn negotiation_happens_at_attach() {
        let rt = runtime();
        let ctx = rt
            .attach_instance(
                7,
                below,
                ExtensionSet::empty(),
                ExtensionSet::from_slice(&[ExtensionName::EyeGazeInteraction, ExtensionName::HandTracking]),
                false,
                (),
            )
            .unwrap();
        assert!(ctx.extensions().is_enabled(ExtensionName::EyeGazeInteraction));
        assert_eq!(ctx.extensions().enabled().len(), 1);
    }

    #[test]
    fn shutdown_drains_once_and_refuses_new_instances() {
        let rt = runtime();
        rt.attach_instance(1, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
            .unwrap();
        rt.attach_instance(2, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
            .unwrap();
        assert_eq!(rt.shutdown(), 2);
        assert_eq!(rt.shutdown(), 0);
        assert_eq!(
            rt.attach_instance(3, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
                .unwrap_err(),
            DispatchError::ShutDown
        );
    }
}
