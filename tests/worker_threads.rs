use rustoffload::{DepthSort, Kernel, Scheduler, SchedulerConfig, SortPayload, initialize_workers};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Fragile;

impl Kernel for Fragile {
    type Payload = u32;
    type Output = u32;

    fn run(&mut self, value: u32) -> u32 {
        if value == 0 {
            panic!("Intentional panic for testing");
        }
        value
    }
}

fn wait_until(mut step: impl FnMut(), done: impl Fn() -> bool, limit: Duration) -> bool {
    let start = Instant::now();
    while !done() {
        if start.elapsed() > limit {
            return false;
        }
        step();
    }
    true
}

#[test]
fn test_worker_recovery_after_panic() {
    let config = SchedulerConfig {
        worker_count: 1,
        ..SchedulerConfig::default()
    };
    let mut scheduler = initialize_workers(&config, Fragile).unwrap();
    let results = Rc::new(Cell::new(0));

    // 1. The panicking job never answers.
    scheduler.submit(0, |_| {}).unwrap();

    // 2. The same worker still serves the next job.
    let results_clone = results.clone();
    scheduler.submit(7, move |v| results_clone.set(v)).unwrap();

    let results_check = results.clone();
    let finished = wait_until(
        || {
            scheduler.poll_timeout(Duration::from_millis(5));
        },
        move || results_check.get() == 7,
        Duration::from_secs(1),
    );
    assert!(finished, "Worker did not process subsequent job!");

    // The panicked job is stuck, so the barrier stays pending.
    let resumed = Rc::new(Cell::new(false));
    let resumed_clone = resumed.clone();
    scheduler.on_frame_sync(move || resumed_clone.set(true));
    scheduler.poll_timeout(Duration::from_millis(20));
    assert!(!resumed.get());
    assert_eq!(scheduler.outstanding(), 1);

    scheduler.shutdown().expect("Shutdown failed");
}

#[test]
fn test_shutdown_with_jobs_in_flight() {
    let config = SchedulerConfig {
        worker_count: 2,
        ..SchedulerConfig::default()
    };
    let mut scheduler = initialize_workers(&config, DepthSort).unwrap();

    for _ in 0..10 {
        let distance: Vec<f32> = (0..10_000).map(|i| (i % 97) as f32).collect();
        scheduler.submit(SortPayload::new(distance), |_| {}).unwrap();
    }

    // Shut down without polling; outstanding callbacks are abandoned.
    let result = scheduler.shutdown();
    assert!(result.is_ok(), "Shutdown should succeed with jobs in flight");
}

#[test]
fn test_named_threads_with_pinning() {
    let config = SchedulerConfig {
        worker_count: 2,
        pin_to_core: true,
        thread_name: "sorter".to_string(),
    };
    let mut scheduler = Scheduler::spawn(&config, |_| DepthSort).unwrap();

    let done = Rc::new(Cell::new(false));
    let done_clone = done.clone();
    scheduler
        .submit(SortPayload::new(vec![0.5, 0.25]), move |sorted| {
            assert_eq!(sorted.order, vec![1, 0]);
            done_clone.set(true);
        })
        .unwrap();

    let done_check = done.clone();
    let finished = wait_until(
        || {
            scheduler.poll_timeout(Duration::from_millis(5));
        },
        move || done_check.get(),
        Duration::from_secs(1),
    );
    assert!(finished);
    scheduler.shutdown().expect("Shutdown failed");
}
