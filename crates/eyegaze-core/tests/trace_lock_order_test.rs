//! System adoption and trace records that read tracker state run concurrently
//! without blocking each other.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use eyegaze_core::{InstanceGaze, SystemProbe, TrackerKind};
use eyegaze_dispatch::trace::{self, TraceEntry, TraceLevel, TraceSink};
use serde_json::json;

#[test]
fn tracing_while_adopting_a_system_does_not_deadlock() {
    let (sink, buffer) = TraceSink::to_buffer("lock-order");
    trace::install(sink);

    let gaze = Arc::new(InstanceGaze::new(true, (0.5, 0.5)));
    let barrier = Arc::new(Barrier::new(2));
    let (done, finished) = mpsc::channel();

    let adopt = {
        let (gaze, barrier, done) = (Arc::clone(&gaze), Arc::clone(&barrier), done.clone());
        thread::spawn(move || {
            let kind = gaze.handle_system(
                7,
                || {
                    barrier.wait();
                    thread::sleep(Duration::from_millis(50));
                    SystemProbe {
                        system_name: "Test HMD".to_string(),
                        ..SystemProbe::default()
                    }
                },
                false,
                || None,
            );
            done.send("adopt").unwrap();
            kind
        })
    };
    let record = {
        let (gaze, barrier) = (Arc::clone(&gaze), Arc::clone(&barrier));
        thread::spawn(move || {
            barrier.wait();
            trace::record(|| {
                thread::sleep(Duration::from_millis(50));
                TraceEntry::new(TraceLevel::Info, "session_created")
                    .with_details(json!({ "tracker": gaze.tracker_kind() }))
            });
            done.send("record").unwrap();
        })
    };

    let mut completed = Vec::new();
    for _ in 0..2 {
        match finished.recv_timeout(Duration::from_secs(5)) {
            Ok(name) => completed.push(name),
            Err(_) => panic!("threads still blocked, completed: {completed:?}"),
        }
    }
    assert_eq!(adopt.join().unwrap(), TrackerKind::Simulated);
    record.join().unwrap();
    trace::uninstall();

    let text = String::from_utf8(buffer.lock().clone()).unwrap();
    assert!(text.contains("\"tracker_selected\""));
    assert!(text.contains("\"session_created\""));
}
