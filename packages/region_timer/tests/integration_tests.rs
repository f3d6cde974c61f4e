//! Integration tests for `region_timer` against the real platform clock.

use std::thread;
use std::time::Duration;

use region_timer::{Error, Profiler};

/// Real sleeps only guarantee a lower bound; this keeps the upper bound generous enough
/// for loaded CI machines.
const SLEEP_TOLERANCE: Duration = Duration::from_millis(500);

fn quiet_profiler() -> Profiler {
    Profiler::builder().log_misuse(false).build().unwrap()
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system clock.
fn repeated_forward_pass_scenario() {
    let profiler = Profiler::new();

    for _ in 0..4 {
        profiler.start("forward");
        thread::sleep(Duration::from_millis(10));
        profiler.stop();
    }

    let report = profiler.report();
    let forward = report.get("forward").unwrap();

    assert_eq!(forward.count(), 4);
    assert!(forward.total() >= Duration::from_millis(40));
    assert!(forward.total() < Duration::from_millis(40) + SLEEP_TOLERANCE);
    assert!(forward.min() >= Duration::from_millis(10));
    assert!(forward.max() < Duration::from_millis(10) + SLEEP_TOLERANCE);
    assert!(forward.min() <= forward.mean() && forward.mean() <= forward.max());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system clock.
fn nested_region_is_not_longer_than_parent() {
    let profiler = Profiler::new();

    profiler.start("A");
    thread::sleep(Duration::from_millis(1));
    profiler.start("B");
    thread::sleep(Duration::from_millis(2));
    profiler.stop();
    profiler.stop();

    let report = profiler.report();
    let a = report.get("A").unwrap();
    let b = report.get("B").unwrap();

    assert!(b.total() <= a.total());
    assert!(a.self_total().unwrap() <= a.total());
    assert_eq!(
        a.self_total().unwrap() + b.total(),
        a.total(),
        "self time of the parent plus its only child is the parent's duration"
    );
}

#[test]
fn training_loop_labels_are_counted_per_completed_pair() {
    const STEPS: u64 = 6;
    const LABELS: [&str; 5] = ["tensor_copy", "forward", "loss", "backward", "optimizer"];

    let profiler = Profiler::new();

    for _ in 0..STEPS {
        for label in LABELS {
            profiler.start(label);
            std::hint::black_box(label.len());
            profiler.stop();
        }
    }

    let report = profiler.report();

    assert_eq!(report.len(), LABELS.len());

    for label in LABELS {
        let stats = report.get(label).unwrap();
        assert_eq!(stats.count(), STEPS);
        assert!(stats.min() <= stats.mean());
        assert!(stats.mean() <= stats.max());
    }

    // Hottest first.
    let totals = report.regions().map(|r| r.total()).collect::<Vec<_>>();
    assert!(totals.windows(2).all(|pair| pair.first() >= pair.get(1)));
}

#[test]
fn deeply_nested_sequences_balance_out() {
    let profiler = Profiler::new();

    // depth-first walk of a small tree: every label is both a parent and a child somewhere.
    for round in 0..3 {
        profiler.start("root");
        for child in 0..=round {
            profiler.start(format!("child_{child}"));
            profiler.start("leaf");
            profiler.stop();
            profiler.stop();
        }
        profiler.stop();
    }

    assert_eq!(profiler.open_regions(), 0);

    let report = profiler.report();
    assert_eq!(report.get("root").unwrap().count(), 3);
    assert_eq!(report.get("leaf").unwrap().count(), 6);
    assert_eq!(report.get("child_0").unwrap().count(), 3);
    assert_eq!(report.get("child_1").unwrap().count(), 2);
    assert_eq!(report.get("child_2").unwrap().count(), 1);
    assert_eq!(report.mismatched_stops(), 0);
}

#[test]
fn stop_without_start_is_reported_and_harmless() {
    let profiler = quiet_profiler();

    profiler.measure("loss", || ());
    let before = profiler.report().get("loss").unwrap().count();

    profiler.stop();
    assert_eq!(profiler.try_stop(), Err(Error::MismatchedRegion));

    let report = profiler.report();
    assert_eq!(report.get("loss").unwrap().count(), before);
    assert_eq!(report.mismatched_stops(), 2);
}

#[test]
fn reset_then_report_is_empty() {
    let profiler = Profiler::new();

    profiler.measure("forward", || ());
    profiler.measure("backward", || ());
    assert_eq!(profiler.report().len(), 2);

    profiler.reset();

    let report = profiler.report();
    assert!(report.is_empty());
    assert_eq!(report.session(), 1);
}

#[test]
fn report_twice_is_identical() {
    let profiler = Profiler::new();

    for _ in 0..5 {
        profiler.measure("forward", || std::hint::black_box(7 * 6));
    }

    assert_eq!(profiler.report(), profiler.report());
}

#[test]
fn stale_report_is_detectable_after_reset() {
    let profiler = Profiler::new();

    profiler.measure("forward", || ());
    let stale = profiler.report();

    profiler.reset();

    assert_ne!(stale.session(), profiler.session());
}

#[test]
fn early_break_with_guards_leaves_no_open_regions() {
    let profiler = Profiler::new();

    for i in 0.. {
        let _step = profiler.region("step");
        let _forward = profiler.region("forward");

        if i == 3 {
            break;
        }
    }

    assert_eq!(profiler.open_regions(), 0);

    let report = profiler.report();
    assert_eq!(report.get("step").unwrap().count(), 4);
    assert_eq!(report.get("forward").unwrap().count(), 4);
    assert_eq!(report.unclosed_regions(), 0);
}

#[test]
fn early_break_without_stop_is_reported_when_thread_finishes() {
    let profiler = quiet_profiler();

    for i in 0..10 {
        profiler.start("step");

        if i == 3 {
            break;
        }

        profiler.stop();
    }

    assert_eq!(profiler.open_regions(), 1);

    let unclosed = profiler.finish_thread();

    assert_eq!(
        unclosed,
        vec![Error::UnclosedRegion {
            label: "step".into(),
            depth: 0
        }]
    );
    assert_eq!(profiler.report().get("step").unwrap().count(), 3);
    assert_eq!(profiler.report().unclosed_regions(), 1);
}

#[test]
fn printed_report_contains_every_label() {
    let profiler = Profiler::new();

    profiler.measure("tensor_copy", || ());
    profiler.measure("optimizer", || ());

    let output = profiler.report().to_string();

    assert!(output.contains("tensor_copy"));
    assert!(output.contains("optimizer"));
    assert!(output.starts_with("region"));
}
