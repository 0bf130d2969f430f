//! Layer teardown. Runs in its own test binary: shutdown is process-wide and
//! permanent.

mod fake_runtime;

use fake_runtime::{Below, TEST_LOCK, calls, reset, simulated_settings};
use openxr_sys as xr;

#[test]
fn shutdown_drains_instances_and_refuses_new_ones() {
    let _guard = TEST_LOCK.lock();
    reset(Below::default(), simulated_settings());

    let _live = fake_runtime::create_instance(&["XR_EXT_eye_gaze_interaction"]).unwrap();
    assert_eq!(eyegaze_abi::shutdown(), 1);
    assert_eq!(eyegaze_abi::shutdown(), 0);

    let refused = fake_runtime::create_instance(&["XR_EXT_eye_gaze_interaction"]);
    assert_eq!(refused.err(), Some(xr::Result::ERROR_INSTANCE_LOST));
    // The instance the runtime created for the refused call is not leaked.
    assert_eq!(calls("xrCreateApiLayerInstance"), 2);
    assert_eq!(calls("xrDestroyInstance"), 1);
}
