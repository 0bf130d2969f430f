use eyegaze_dispatch::trace::{self, TraceEntry, TraceSink};
use eyegaze_dispatch::{
    ContextRegistry, ExtensionName, ExtensionRegistry, ExtensionSet, FunctionName, InstanceContext,
    LayerManifest, LayerRuntime, NextLayerTable, ProcRoute, Resolution, VoidFunction,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

static TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

unsafe extern "system" fn create_session_trampoline() {}
unsafe extern "system" fn gipa_trampoline() {}
unsafe extern "system" fn destroy_instance_trampoline() {}
unsafe extern "system" fn below_get_instance_properties() {}
unsafe extern "system" fn below_generic() {}

fn trampolines(name: FunctionName) -> Option<VoidFunction> {
    match name {
        FunctionName::CreateSession => Some(create_session_trampoline as VoidFunction),
        FunctionName::GetInstanceProcAddr => Some(gipa_trampoline as VoidFunction),
        FunctionName::DestroyInstance => Some(destroy_instance_trampoline as VoidFunction),
        _ => None,
    }
}

#[test]
fn create_session_override_with_nothing_available_below() {
    let _guard = TEST_LOCK.lock();
    let manifest = LayerManifest::from_lists(
        &["xrCreateSession"],
        &["xrGetInstanceProperties"],
        &["XR_EXT_eye_gaze_interaction"],
    )
    .unwrap();
    let runtime: LayerRuntime<(), ()> = LayerRuntime::new(manifest, &trampolines).unwrap();

    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lookups);
    let below = move |name: FunctionName| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(match name {
            FunctionName::GetInstanceProperties => below_get_instance_properties as VoidFunction,
            _ => below_generic as VoidFunction,
        })
    };

    let ctx = runtime
        .attach_instance(0x10, below, ExtensionSet::empty(), ExtensionSet::empty(), false, ())
        .unwrap();
    assert!(ctx.extensions().enabled().is_empty());

    match runtime.proc_route(&ctx, "xrCreateSession") {
        ProcRoute::Layer(f) => assert_eq!(f as usize, create_session_trampoline as usize),
        other => panic!("xrCreateSession routed to {other:?}"),
    }
    match runtime.proc_route(&ctx, "xrGetInstanceProperties") {
        ProcRoute::Next(Resolution::Resolved(f)) => {
            assert_eq!(f as usize, below_get_instance_properties as usize);
        }
        other => panic!("xrGetInstanceProperties routed to {other:?}"),
    }
    // The trampoline is handed out without asking the layer below.
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_first_resolution_runs_one_lookup() {
    const THREADS: usize = 8;
    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lookups);
    let table = Arc::new(NextLayerTable::new(move |_: FunctionName| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::yield_now();
        Some(below_generic as VoidFunction)
    }));
    let registry = Arc::new(ExtensionRegistry::default());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let table = Arc::clone(&table);
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                table
                    .resolve(FunctionName::PathToString, &registry)
                    .function()
                    .map(|f| f as usize)
            })
        })
        .collect();

    let addresses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.iter().all(|a| *a == Some(below_generic as usize)));
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_double_destroy_forwards_once() {
    let registry: Arc<ContextRegistry<(), ()>> = Arc::new(ContextRegistry::new());
    registry.insert_instance(InstanceContext::new(
        1,
        NextLayerTable::new(|_: FunctionName| -> Option<VoidFunction> { None }),
        ExtensionRegistry::default(),
        false,
        (),
    ));
    registry.insert_session(1, 0x51, ()).unwrap();

    let forwards = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let forwards = Arc::clone(&forwards);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if registry.remove_session(0x51).is_some() {
                    forwards.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(forwards.load(Ordering::SeqCst), 1);
    assert!(registry.instance(1).is_some());
}

#[test]
fn disabled_extension_never_reaches_the_layer_below() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lookups);
    let table = NextLayerTable::new(move |_: FunctionName| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(below_generic as VoidFunction)
    });
    let mut registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[
        ExtensionName::EyeGazeInteraction,
        ExtensionName::EyeTrackingSocialFB,
    ]));
    registry.negotiate(ExtensionSet::from_slice(&[ExtensionName::EyeGazeInteraction]));

    for name in [
        FunctionName::CreateEyeTrackerFB,
        FunctionName::GetEyeGazesFB,
        FunctionName::DestroyEyeTrackerFB,
    ] {
        let err = table.resolve(name, &registry).into_result(name).unwrap_err();
        assert_eq!(
            err.to_xr_result(),
            openxr_sys::Result::ERROR_FUNCTION_UNSUPPORTED
        );
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn runtime_activity_is_traced() {
    let _guard = TEST_LOCK.lock();
    let (sink, buffer) = TraceSink::to_buffer("dispatch-test");
    let previous = trace::install(sink);

    let manifest = LayerManifest::from_lists(&["xrCreateSession"], &[], &[]).unwrap();
    let runtime: LayerRuntime<(), ()> = LayerRuntime::new(manifest, &trampolines).unwrap();
    runtime
        .attach_instance(
            0x20,
            |_: FunctionName| -> Option<VoidFunction> { None },
            ExtensionSet::empty(),
            ExtensionSet::empty(),
            false,
            (),
        )
        .unwrap();
    runtime.detach_instance(0x20);

    trace::uninstall();
    if let Some(previous) = previous {
        trace::install(previous);
    }

    let text = String::from_utf8(buffer.lock().clone()).unwrap();
    let events: Vec<String> = text
        .lines()
        .map(|line| serde_json::from_str::<TraceEntry>(line).unwrap().event)
        .collect();
    assert_eq!(
        events,
        vec!["dispatch_table_built", "instance_attached", "instance_detached"]
    );
}
