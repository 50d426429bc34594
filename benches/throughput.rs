//! Throughput benchmark using criterion.
//!
//! Measures end-to-end latency of submitting a batch of small jobs and
//! pumping `update` until every completion callback has been delivered.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jobmill::{JobDescriptor, JobKind, JobScheduler, SchedulerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const JOB_COUNT: usize = 512;

fn bench_submit_and_drain(c: &mut Criterion) {
    let num_workers = num_cpus::get();
    let masks = vec![JobKind::GENERAL; num_workers];
    let config = SchedulerConfig {
        queue_capacity: JOB_COUNT,
        result_slots: JOB_COUNT,
        poll_interval: Duration::from_millis(1),
        ..SchedulerConfig::default()
    };
    let mut scheduler = JobScheduler::with_config(&masks, config).expect("scheduler start");

    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(JOB_COUNT as u64));
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("submit_and_drain", num_workers), |b| {
        b.iter(|| {
            let done = Arc::new(AtomicUsize::new(0));
            for _ in 0..JOB_COUNT {
                let done = done.clone();
                let job = JobDescriptor::builder(|_, _| {
                    std::hint::black_box(1 + 1);
                    true
                })
                .on_success(move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .expect("descriptor build");
                scheduler.submit(job).expect("submit");
            }

            while done.load(Ordering::SeqCst) < JOB_COUNT {
                scheduler.update().expect("update");
                std::thread::yield_now();
            }
        })
    });

    group.finish();
    scheduler.shutdown();
}

criterion_group!(benches, bench_submit_and_drain);
criterion_main!(benches);
