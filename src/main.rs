use jobmill::{JobDescriptor, JobKind, JobScheduler, Priority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    println!("jobmill - fixed-size priority job scheduler\n");

    // Two generalists plus a worker that also takes decode jobs.
    let masks = [
        JobKind::GENERAL,
        JobKind::GENERAL,
        JobKind::GENERAL | JobKind::DECODE,
    ];
    let mut scheduler = JobScheduler::new(&masks).expect("failed to start scheduler");
    println!("Started {} workers\n", scheduler.worker_count());

    // Example 1: a batch of normal-priority jobs with owner-thread callbacks.
    println!("Example 1: batch of NORMAL jobs");
    let done = Arc::new(AtomicUsize::new(0));
    let num_jobs = 100;

    for i in 0..num_jobs as u64 {
        let done = done.clone();
        let job = JobDescriptor::builder(move |params, results| {
            let x = u64::from_le_bytes(params.try_into().unwrap());
            results.copy_from_slice(&(x * x).to_le_bytes());
            true
        })
        .params(&i.to_le_bytes())
        .result_len(8)
        .on_success(move |_| {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .expect("descriptor allocation failed");
        scheduler.submit(job).expect("submit failed");
    }

    let start = Instant::now();
    while done.load(Ordering::SeqCst) < num_jobs {
        scheduler.update().expect("update failed");
        thread::sleep(Duration::from_millis(2));
    }
    println!("  {} jobs completed in {:?}\n", num_jobs, start.elapsed());

    // Example 2: a HIGH job takes the direct mailbox path while workers idle.
    println!("Example 2: HIGH priority bypass");
    let job = JobDescriptor::builder(|_, _| true)
        .priority(Priority::High)
        .on_success(|_| println!("  high-priority job done"))
        .build()
        .expect("descriptor allocation failed");
    scheduler.submit(job).expect("submit failed");
    println!(
        "  HIGH queue length right after submit: {}",
        scheduler.queue_len(Priority::High)
    );
    while scheduler.update().expect("update failed") == 0 {
        thread::sleep(Duration::from_millis(2));
    }

    println!("\nShutting down...");
    scheduler.shutdown();
    println!("Done!");
}
