//! Result-table overflow policies, exercised by completing more jobs than
//! the table has slots between two `update` calls.

use jobmill::{
    JobDescriptor, JobKind, JobScheduler, OverflowPolicy, Priority, SchedulerConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn overflow_config(policy: OverflowPolicy) -> SchedulerConfig {
    SchedulerConfig {
        result_slots: 4,
        poll_interval: Duration::from_millis(1),
        result_overflow: policy,
        ..SchedulerConfig::default()
    }
}

/// Submits `n` HIGH jobs to `n` idle workers (direct mailbox path, no update
/// needed for dispatch) and waits until every worker is idle again, at which
/// point all completions have been stored or dropped.
fn run_jobs_to_completion(scheduler: &JobScheduler, n: usize, fired: &Arc<AtomicUsize>) {
    for _ in 0..n {
        let fired = fired.clone();
        // Each job outlives the submission loop, so all n land directly in
        // distinct idle mailboxes and complete concurrently.
        let job = JobDescriptor::builder(|_, _| {
            thread::sleep(Duration::from_millis(20));
            true
        })
        .priority(Priority::High)
        .on_success(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();
        scheduler.submit(job).unwrap();
    }
    assert_eq!(scheduler.queue_len(Priority::High), 0);

    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.idle_workers() != scheduler.worker_count() {
        assert!(Instant::now() < deadline, "workers never drained");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_drop_newest_loses_excess_completions() {
    let masks = vec![JobKind::GENERAL; 6];
    let mut scheduler =
        JobScheduler::with_config(&masks, overflow_config(OverflowPolicy::DropNewest)).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    run_jobs_to_completion(&scheduler, 6, &fired);

    // 4 slots: exactly 4 callbacks survive, 2 are dropped and counted.
    assert_eq!(scheduler.pending_results(), 4);
    assert_eq!(scheduler.dropped_results(), 2);

    let delivered = scheduler.update().unwrap();
    assert_eq!(delivered, 4);
    assert_eq!(fired.load(Ordering::SeqCst), 4);
    assert_eq!(scheduler.pending_results(), 0);
    scheduler.shutdown();
}

#[test]
fn test_grow_policy_delivers_everything() {
    let masks = vec![JobKind::GENERAL; 6];
    let mut scheduler =
        JobScheduler::with_config(&masks, overflow_config(OverflowPolicy::Grow)).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    run_jobs_to_completion(&scheduler, 6, &fired);

    assert_eq!(scheduler.dropped_results(), 0);
    let delivered = scheduler.update().unwrap();
    assert_eq!(delivered, 6);
    assert_eq!(fired.load(Ordering::SeqCst), 6);
    scheduler.shutdown();
}

#[test]
fn test_drop_oldest_evicts_earlier_completions() {
    let masks = vec![JobKind::GENERAL; 6];
    let mut scheduler =
        JobScheduler::with_config(&masks, overflow_config(OverflowPolicy::DropOldest)).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    run_jobs_to_completion(&scheduler, 6, &fired);

    assert_eq!(scheduler.pending_results(), 4);
    assert_eq!(scheduler.dropped_results(), 2);
    assert_eq!(scheduler.update().unwrap(), 4);
    scheduler.shutdown();
}

#[test]
fn test_jobs_without_callbacks_never_occupy_slots() {
    let mut scheduler = JobScheduler::with_config(
        &[JobKind::GENERAL],
        overflow_config(OverflowPolicy::DropNewest),
    )
    .unwrap();

    for _ in 0..8 {
        let job = JobDescriptor::builder(|_, _| true)
            .priority(Priority::High)
            .build()
            .unwrap();
        scheduler.submit(job).unwrap();
        // Single worker: wait for it to finish before the next submit.
        let deadline = Instant::now() + Duration::from_secs(2);
        while scheduler.idle_workers() != 1 {
            assert!(Instant::now() < deadline, "worker never finished");
            thread::sleep(Duration::from_millis(1));
        }
    }

    assert_eq!(scheduler.pending_results(), 0);
    assert_eq!(scheduler.dropped_results(), 0);
    assert_eq!(scheduler.update().unwrap(), 0);
    scheduler.shutdown();
}
