//! The scheduler: priority tiers, the worker array, and the tick pump.
//!
//! `submit` is the producer side and may be called from any thread, including
//! from inside a running job via a [`SubmitHandle`]. `update` is the consumer
//! side: it dispatches queued jobs to idle workers and delivers completion
//! callbacks, and it only runs on the thread that constructed the scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SubmitError};
use crate::job::JobDescriptor;
use crate::queue::BoundedQueue;
use crate::results::{OverflowPolicy, ResultTable};
use crate::worker::{Worker, WorkerState};
use crate::{JobKind, Priority};

/// Tunable capacities and timing for a scheduler instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of each priority tier's queue. Default: 1024.
    pub queue_capacity: usize,
    /// Slots in the completion table. Bounds how many undelivered results
    /// can exist between two `update` calls. Default: 512.
    pub result_slots: usize,
    /// How long an idle worker sleeps between mailbox polls. This is also
    /// the worst-case latency for a worker to notice newly assigned work.
    /// Default: 10 ms.
    pub poll_interval: Duration,
    /// Policy when a completion arrives and the table is full.
    pub result_overflow: OverflowPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            queue_capacity: 1024,
            result_slots: 512,
            poll_interval: Duration::from_millis(10),
            result_overflow: OverflowPolicy::default(),
        }
    }
}

/// State reachable from every thread: the tier queues, the worker mailboxes,
/// the completion table, and the running flag.
struct Shared {
    tiers: [Mutex<BoundedQueue<JobDescriptor>>; 3],
    workers: Vec<Arc<WorkerState>>,
    results: Arc<ResultTable>,
    running: Arc<AtomicBool>,
}

impl Shared {
    fn submit(&self, mut job: JobDescriptor) -> Result<(), SubmitError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(SubmitError::ShutDown);
        }

        // High priority tries for an idle matching mailbox first, skipping
        // the queue entirely when one is free.
        if job.priority() == Priority::High {
            match self.try_dispatch(job) {
                Ok(()) => return Ok(()),
                Err(back) => job = back,
            }
        }

        let priority = job.priority();
        let mut tier = self.tiers[priority.tier()].lock().unwrap();
        tier.enqueue(job).map_err(|_| {
            warn!("{:?} tier full; rejecting submission", priority);
            SubmitError::QueueFull(priority)
        })
    }

    /// Offers `job` to the first mask-matching worker with an empty mailbox.
    /// Hands the descriptor back when every candidate is busy.
    fn try_dispatch(&self, mut job: JobDescriptor) -> Result<(), JobDescriptor> {
        for worker in &self.workers {
            if !worker.kind_mask.intersects(job.kind()) {
                continue;
            }
            match worker.try_assign(job) {
                Ok(()) => return Ok(()),
                Err(back) => job = back,
            }
        }
        Err(job)
    }
}

/// A fixed pool of affinity-masked worker threads fed from three bounded
/// priority queues, with all completion callbacks delivered on the owner
/// thread by [`update`](JobScheduler::update).
///
/// The scheduler is an owned object, not a global; independent instances can
/// coexist, and tests construct and tear one down per case.
pub struct JobScheduler {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
    owner: ThreadId,
}

impl JobScheduler {
    /// Spins up one worker per entry of `kind_masks`, each permitted to run
    /// exactly the job kinds its mask covers. Uses the default config.
    pub fn new(kind_masks: &[JobKind]) -> std::io::Result<Self> {
        Self::with_config(kind_masks, SchedulerConfig::default())
    }

    /// As [`new`](Self::new), with explicit capacities and timing.
    pub fn with_config(kind_masks: &[JobKind], config: SchedulerConfig) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let results = Arc::new(ResultTable::new(
            config.result_slots,
            config.result_overflow,
        ));
        let states: Vec<Arc<WorkerState>> = kind_masks
            .iter()
            .enumerate()
            .map(|(index, &mask)| Arc::new(WorkerState::new(index, mask)))
            .collect();

        let shared = Arc::new(Shared {
            tiers: [
                Mutex::new(BoundedQueue::with_capacity(config.queue_capacity)),
                Mutex::new(BoundedQueue::with_capacity(config.queue_capacity)),
                Mutex::new(BoundedQueue::with_capacity(config.queue_capacity)),
            ],
            workers: states.clone(),
            results: Arc::clone(&results),
            running: Arc::clone(&running),
        });

        let workers = states
            .iter()
            .map(|state| {
                Worker::spawn(
                    Arc::clone(state),
                    Arc::clone(&results),
                    Arc::clone(&running),
                    config.poll_interval,
                )
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        debug!("scheduler started with {} workers", workers.len());
        Ok(JobScheduler {
            shared,
            workers,
            owner: thread::current().id(),
        })
    }

    /// Submits a job. Callable from any thread.
    ///
    /// High-priority jobs go straight into an idle matching worker's mailbox
    /// when one exists; everything else lands on its tier's queue. A full
    /// tier reports [`SubmitError::QueueFull`] rather than dropping the job.
    pub fn submit(&self, job: JobDescriptor) -> Result<(), SubmitError> {
        self.shared.submit(job)
    }

    /// A cloneable, `Send` handle for submitting from other threads, notably
    /// from inside a running job's entry point.
    pub fn handle(&self) -> SubmitHandle {
        SubmitHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Dispatches queued jobs and delivers completion callbacks.
    ///
    /// Call once per tick from the owner thread. Tiers drain in order HIGH,
    /// NORMAL, LOW; within a tier, dispatch stops at the first job with no
    /// idle matching worker, preserving FIFO order at the cost of head-of-line
    /// blocking. Afterwards every stored completion runs here, in slot-index
    /// order. Returns the number of callbacks invoked.
    pub fn update(&mut self) -> Result<usize, SchedulerError> {
        if thread::current().id() != self.owner {
            return Err(SchedulerError::NotOwnerThread);
        }

        for priority in Priority::DISPATCH_ORDER {
            self.dispatch_tier(priority);
        }

        let completed = self.shared.results.take_completed();
        let count = completed.len();
        for entry in completed {
            entry.invoke();
        }
        Ok(count)
    }

    fn dispatch_tier(&self, priority: Priority) {
        let mut queue = self.shared.tiers[priority.tier()].lock().unwrap();
        loop {
            let kind = match queue.peek() {
                Some(job) => job.kind(),
                None => break,
            };
            let candidate = self
                .shared
                .workers
                .iter()
                .find(|w| w.kind_mask.intersects(kind) && w.is_idle());
            let Some(worker) = candidate else {
                // Head job has no free worker; later jobs in this tier wait
                // behind it to keep FIFO order.
                break;
            };
            let Some(job) = queue.dequeue() else { break };
            if let Err(back) = worker.try_assign(job) {
                // A concurrent high-priority submit took the mailbox between
                // the scan and the assign. Restore the head and rescan.
                queue
                    .push_front(back)
                    .unwrap_or_else(|_| panic!("dequeue freed a slot"));
            }
        }
    }

    /// Stops accepting work, joins every worker, and clears the queues and
    /// mailboxes. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        for worker in &mut self.workers {
            worker.join();
        }
        for state in &self.shared.workers {
            state.clear();
        }
        for tier in &self.shared.tiers {
            tier.lock().unwrap().clear();
        }
        if was_running {
            debug!("scheduler shut down");
        }
    }

    /// Number of jobs waiting on `priority`'s queue.
    pub fn queue_len(&self, priority: Priority) -> usize {
        self.shared.tiers[priority.tier()].lock().unwrap().len()
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers with an empty mailbox right now.
    pub fn idle_workers(&self) -> usize {
        self.shared.workers.iter().filter(|w| w.is_idle()).count()
    }

    /// Completions lost to result-table overflow since startup.
    pub fn dropped_results(&self) -> u64 {
        self.shared.results.dropped()
    }

    /// Completions stored but not yet delivered by `update`.
    pub fn pending_results(&self) -> usize {
        self.shared.results.pending()
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clonable producer-side handle. Holds the scheduler's shared state alive
/// but cannot dispatch or deliver callbacks.
#[derive(Clone)]
pub struct SubmitHandle {
    shared: Arc<Shared>,
}

impl SubmitHandle {
    /// Same contract as [`JobScheduler::submit`].
    pub fn submit(&self, job: JobDescriptor) -> Result<(), SubmitError> {
        self.shared.submit(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_creation() {
        let mut scheduler =
            JobScheduler::new(&[JobKind::GENERAL, JobKind::GENERAL | JobKind::GPU]).unwrap();
        assert_eq!(scheduler.worker_count(), 2);
        assert_eq!(scheduler.idle_workers(), 2);
        scheduler.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let mut scheduler = JobScheduler::new(&[JobKind::GENERAL]).unwrap();
        scheduler.shutdown();

        let job = JobDescriptor::builder(|_, _| true).build().unwrap();
        assert!(matches!(
            scheduler.submit(job),
            Err(SubmitError::ShutDown)
        ));
    }

    #[test]
    fn test_handle_submits_to_same_queues() {
        let scheduler = JobScheduler::new(&[JobKind::GPU]).unwrap();
        let handle = scheduler.handle();

        // GENERAL job with only a GPU worker configured: it must queue.
        let job = JobDescriptor::builder(|_, _| true).build().unwrap();
        handle.submit(job).unwrap();
        assert_eq!(scheduler.queue_len(Priority::Normal), 1);
    }

    #[test]
    fn test_update_counts_delivered_callbacks() {
        let mut scheduler = JobScheduler::new(&[JobKind::GENERAL]).unwrap();
        let job = JobDescriptor::builder(|_, _| true)
            .on_success(|_| {})
            .build()
            .unwrap();
        scheduler.submit(job).unwrap();

        let mut delivered = 0;
        for _ in 0..100 {
            delivered += scheduler.update().unwrap();
            if delivered > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(delivered, 1);
    }
}
