//! Profiles the phases of a simulated training loop.
//!
//! Shows manual `start()`/`stop()` pairs, scoped regions and what happens when a loop is
//! left with a region still open.
//!
//! Run with: `cargo run --example training_loop`.

use std::thread;
use std::time::Duration;

use region_timer::Profiler;

fn main() {
    // Misuse is reported through `tracing`, so install a subscriber to see it.
    tracing_subscriber::fmt().init();

    let profiler = Profiler::new();

    for step in 0..8 {
        profiler.start("tensor_copy");
        thread::sleep(Duration::from_millis(2));
        profiler.stop();

        profiler.measure("forward", || thread::sleep(Duration::from_millis(10)));

        profiler.start("loss");
        thread::sleep(Duration::from_millis(1));
        profiler.stop();

        profiler.start("backward");
        thread::sleep(Duration::from_millis(15));

        if step == 3 {
            // Oops, "backward" is never stopped on this path.
            break;
        }

        profiler.stop();

        let _optimizer = profiler.region("optimizer");
        thread::sleep(Duration::from_millis(3));
    }

    // Scoped regions close themselves but "backward" is still open.
    println!("Open regions after the loop: {}", profiler.open_regions());

    for problem in profiler.finish_thread() {
        println!("Problem: {problem}");
    }

    println!();
    profiler.report().print_to_stdout();
}
