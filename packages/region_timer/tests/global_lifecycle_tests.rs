//! Tests for the process-wide profiler.
//!
//! The process-wide profiler is shared by every test in a binary, so the whole lifecycle
//! is exercised by a single test in its own binary.

use std::thread;

use region_timer::{Profiler, global};

#[test]
fn process_wide_lifecycle() {
    // Before init, everything is accepted and nothing is measured.
    assert!(!global::is_initialized());
    global::start("ignored");
    global::stop();
    drop(global::region("ignored"));
    global::reset();
    assert!(global::report().is_empty());
    assert!(global::shutdown().is_none());

    let profiler = global::init_with(Profiler::builder().log_misuse(false));
    assert!(global::is_initialized());

    // A second init returns the same profiler.
    let again = global::init();
    again.measure("shared_handle", || ());
    assert_eq!(profiler.report().get("shared_handle").unwrap().count(), 1);

    // The crate root re-exports the free functions.
    region_timer::start("forward");
    region_timer::stop();

    thread::spawn(|| {
        let _forward = global::region("forward");
    })
    .join()
    .unwrap();

    assert_eq!(global::report().get("forward").unwrap().count(), 2);

    global::reset();
    assert!(global::report().is_empty());
    assert_eq!(global::profiler().unwrap().session(), 1);

    global::start("left_open");
    let report = global::shutdown().unwrap();

    assert_eq!(report.unclosed_regions(), 1);
    assert!(!global::is_initialized());
    assert!(global::report().is_empty());

    // Can be initialized again after shutdown, with fresh statistics.
    global::init();
    global::start("second_life");
    global::stop();
    let report = global::shutdown().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.session(), 0);
}
