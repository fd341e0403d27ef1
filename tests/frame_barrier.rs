use crossbeam::channel::Receiver;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustoffload::{ChannelPort, FrameSync, Request, Response, Scheduler, Submission};
use std::cell::Cell;
use std::rc::Rc;

type TestScheduler = Scheduler<ChannelPort<u32>, u32>;

/// The receivers must outlive the scheduler or posting to the ports fails.
fn scheduler_with(workers: usize) -> (TestScheduler, Vec<Receiver<Request<u32>>>) {
    let (ports, receivers): (Vec<_>, Vec<_>) = (0..workers).map(|_| ChannelPort::new()).unzip();
    (Scheduler::new(ports).unwrap(), receivers)
}

#[test]
fn test_scenario_three_jobs_two_workers() {
    let (port_a, rx_a) = ChannelPort::new();
    let (port_b, rx_b) = ChannelPort::new();
    let mut scheduler: TestScheduler = Scheduler::new(vec![port_a, port_b]).unwrap();
    rx_a.try_recv().unwrap();
    rx_b.try_recv().unwrap();

    for value in 0..3 {
        scheduler.submit(value, |_| {}).unwrap();
    }

    // Ids 0, 1, 2 went to workers 0, 1, 0.
    let ids_a: Vec<_> = rx_a.try_iter().filter_map(|r| r.job_id()).collect();
    let ids_b: Vec<_> = rx_b.try_iter().filter_map(|r| r.job_id()).collect();
    assert_eq!(ids_a, vec![0, 2]);
    assert_eq!(ids_b, vec![1]);

    let fired = Rc::new(Cell::new(0));
    let fired_clone = fired.clone();
    assert_eq!(
        scheduler.on_frame_sync(move || fired_clone.set(fired_clone.get() + 1)),
        FrameSync::Deferred
    );

    scheduler.handle_response(Response::JobDone { id: 2, payload: 0 });
    assert_eq!(fired.get(), 0);
    scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });
    assert_eq!(fired.get(), 0);
    scheduler.handle_response(Response::JobDone { id: 1, payload: 0 });
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_completion_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for n in 0..24u32 {
        let (mut scheduler, _workers) = scheduler_with(3);
        let completed = Rc::new(Cell::new(0u32));

        for value in 0..n {
            let completed = completed.clone();
            let submitted = scheduler
                .submit(value, move |_| completed.set(completed.get() + 1))
                .unwrap();
            assert_eq!(submitted, Submission::Dispatched(value));
        }

        let fired = Rc::new(Cell::new(0));
        let fired_clone = fired.clone();
        let sync = scheduler.on_frame_sync(move || fired_clone.set(fired_clone.get() + 1));

        if n == 0 {
            assert_eq!(sync, FrameSync::Immediate);
            assert_eq!(fired.get(), 1);
            continue;
        }

        let mut order: Vec<u32> = (0..n).collect();
        order.shuffle(&mut rng);
        for (delivered, id) in order.into_iter().enumerate() {
            assert_eq!(fired.get(), 0, "continuation fired after {} of {}", delivered, n);
            scheduler.handle_response(Response::JobDone { id, payload: id });
        }

        assert_eq!(fired.get(), 1);
        assert_eq!(completed.get(), n);
        assert_eq!(scheduler.outstanding(), 0);
    }
}

#[test]
fn test_stale_results_do_not_release_barrier() {
    let (mut scheduler, _workers) = scheduler_with(1);
    scheduler.submit(1, |_| {}).unwrap();
    scheduler.submit(2, |_| {}).unwrap();

    let fired = Rc::new(Cell::new(false));
    let fired_clone = fired.clone();
    scheduler.on_frame_sync(move || fired_clone.set(true));

    scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });
    // Duplicate delivery and an id that was never handed out.
    scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });
    scheduler.handle_response(Response::JobDone { id: 41, payload: 0 });

    assert!(!fired.get());
    assert_eq!(scheduler.outstanding(), 1);

    scheduler.handle_response(Response::JobDone { id: 1, payload: 0 });
    assert!(fired.get());
    assert_eq!(scheduler.stats().unmatched_results, 2);
}

#[test]
fn test_stuck_job_keeps_barrier_pending() {
    let (mut scheduler, _workers) = scheduler_with(2);
    scheduler.submit(0, |_| {}).unwrap();
    scheduler.submit(0, |_| {}).unwrap();

    let fired = Rc::new(Cell::new(false));
    let fired_clone = fired.clone();
    scheduler.on_frame_sync(move || fired_clone.set(true));
    scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });

    // Job 1 never answers. Nothing times it out.
    assert!(!fired.get());
    assert!(scheduler.has_pending_continuation());
    assert_eq!(scheduler.outstanding(), 1);
}

#[test]
fn test_ids_restart_after_every_barrier() {
    let (port, requests) = ChannelPort::new();
    let mut scheduler: TestScheduler = Scheduler::new(vec![port]).unwrap();

    for frame in 0..3 {
        for _ in 0..2 {
            scheduler.submit(frame, |_| {}).unwrap();
        }
        scheduler.on_frame_sync(|| {});
        scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });
        scheduler.handle_response(Response::JobDone { id: 1, payload: 0 });
    }

    let ids: Vec<_> = requests.try_iter().filter_map(|r| r.job_id()).collect();
    assert_eq!(ids, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_reused_id_takes_over_stuck_job() {
    let (mut scheduler, _workers) = scheduler_with(1);

    let old_result = Rc::new(Cell::new(None));
    let old_result_clone = old_result.clone();
    let first = scheduler
        .submit(10, move |v| old_result_clone.set(Some(v)))
        .unwrap();
    assert_eq!(first, Submission::Dispatched(0));

    let resumed = Rc::new(Cell::new(0));
    let resumed_clone = resumed.clone();
    assert_eq!(
        scheduler.on_frame_sync(move || resumed_clone.set(resumed_clone.get() + 1)),
        FrameSync::Deferred
    );

    // Next frame: id 0 is handed out again while the first job is still stuck.
    let new_result = Rc::new(Cell::new(None));
    let new_result_clone = new_result.clone();
    let second = scheduler
        .submit(20, move |v| new_result_clone.set(Some(v)))
        .unwrap();
    assert_eq!(second, Submission::Dispatched(0));
    assert_eq!(scheduler.outstanding(), 1);
    assert!(scheduler.has_pending_continuation());

    // The late answer from the first job reaches the newer callback.
    scheduler.handle_response(Response::JobDone { id: 0, payload: 10 });
    assert_eq!(new_result.get(), Some(10));
    assert_eq!(old_result.get(), None);
    assert_eq!(scheduler.outstanding(), 0);
    assert!(!scheduler.has_pending_continuation());
    assert_eq!(resumed.get(), 1);

    // The second job's own answer finds nothing left to complete.
    scheduler.handle_response(Response::JobDone { id: 0, payload: 20 });
    assert_eq!(new_result.get(), Some(10));
    assert_eq!(resumed.get(), 1);
    assert_eq!(scheduler.stats().unmatched_results, 1);
}

#[test]
fn test_barrier_with_completed_jobs_runs_immediately() {
    let (mut scheduler, _workers) = scheduler_with(2);
    scheduler.submit(0, |_| {}).unwrap();
    scheduler.handle_response(Response::JobDone { id: 0, payload: 0 });

    let fired = Rc::new(Cell::new(false));
    let fired_clone = fired.clone();
    assert_eq!(
        scheduler.on_frame_sync(move || fired_clone.set(true)),
        FrameSync::Immediate
    );
    assert!(fired.get());
}

#[test]
fn test_ready_probe_messages() {
    let (port, requests) = ChannelPort::<u32>::new();
    let _scheduler: TestScheduler = Scheduler::new(vec![port]).unwrap();
    assert_eq!(requests.try_recv().unwrap(), Request::Init { worker: 0 });
}
