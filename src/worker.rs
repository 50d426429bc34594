//! Worker threads and their single-slot mailboxes.
//!
//! Each worker is one OS thread with a mailbox holding at most one job. The
//! mailbox is the unit of busy/idle state: an `Empty` slot means the worker
//! can accept work, anything else means it is occupied. Assignment happens
//! from the outside (the scheduler's submit/update paths) under the mailbox
//! mutex; the worker itself never checks type affinity and executes whatever
//! lands in its slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, trace};

use crate::job::JobDescriptor;
use crate::results::ResultTable;
use crate::JobKind;

/// Occupancy state of a worker's mailbox.
///
/// `Running` keeps the slot counted as busy while the descriptor has been
/// moved out for execution, so "mailbox occupied" remains equivalent to
/// "worker busy" for the whole lifetime of a job.
pub(crate) enum MailSlot {
    Empty,
    Pending(JobDescriptor),
    Running,
}

/// Shared per-worker state: the affinity mask fixed at construction and the
/// mutex-guarded mailbox. The scheduler scans these; the worker thread polls
/// its own.
pub(crate) struct WorkerState {
    pub(crate) index: usize,
    pub(crate) kind_mask: JobKind,
    slot: Mutex<MailSlot>,
}

impl WorkerState {
    pub(crate) fn new(index: usize, kind_mask: JobKind) -> Self {
        WorkerState {
            index,
            kind_mask,
            slot: Mutex::new(MailSlot::Empty),
        }
    }

    /// Atomically checks for an empty mailbox and fills it.
    ///
    /// Returns the descriptor back when the slot is already occupied, so the
    /// caller can fall back to queueing or try the next worker.
    pub(crate) fn try_assign(&self, job: JobDescriptor) -> Result<(), JobDescriptor> {
        let mut slot = self.slot.lock().unwrap();
        match *slot {
            MailSlot::Empty => {
                *slot = MailSlot::Pending(job);
                Ok(())
            }
            _ => Err(job),
        }
    }

    /// True when the mailbox holds nothing, pending or running.
    pub(crate) fn is_idle(&self) -> bool {
        matches!(*self.slot.lock().unwrap(), MailSlot::Empty)
    }

    /// Moves a pending descriptor out for execution, leaving the slot marked
    /// `Running`. Returns `None` when there is nothing to do.
    fn take_pending(&self) -> Option<JobDescriptor> {
        let mut slot = self.slot.lock().unwrap();
        match std::mem::replace(&mut *slot, MailSlot::Running) {
            MailSlot::Pending(job) => Some(job),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Marks the job done, making the worker idle again.
    fn finish(&self) {
        *self.slot.lock().unwrap() = MailSlot::Empty;
    }

    /// Drops any undispatched descriptor. Used at shutdown.
    pub(crate) fn clear(&self) {
        *self.slot.lock().unwrap() = MailSlot::Empty;
    }
}

/// A worker thread handle paired with its shared state.
pub(crate) struct Worker {
    state: Arc<WorkerState>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the worker thread and starts its poll loop.
    ///
    /// `poll_interval` bounds how long an idle worker can take to notice a
    /// newly assigned mailbox entry.
    pub(crate) fn spawn(
        state: Arc<WorkerState>,
        results: Arc<ResultTable>,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> std::io::Result<Self> {
        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(format!("jobmill-worker-{}", state.index))
            .spawn(move || {
                debug!("worker {} started", thread_state.index);
                run_loop(&thread_state, &results, &running, poll_interval);
                debug!("worker {} stopped", thread_state.index);
            })?;

        Ok(Worker {
            state,
            handle: Some(handle),
        })
    }

    /// Joins the worker thread. Safe to call again after it has been joined.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker {} panicked", self.state.index);
            }
        }
    }
}

/// The poll loop: run whatever is in the mailbox, otherwise sleep one
/// interval and look again.
fn run_loop(
    state: &WorkerState,
    results: &ResultTable,
    running: &AtomicBool,
    poll_interval: Duration,
) {
    while running.load(Ordering::Acquire) {
        match state.take_pending() {
            Some(job) => {
                let JobDescriptor {
                    entry,
                    on_success,
                    on_fail,
                    params,
                    results: mut result_bytes,
                    ..
                } = job;

                // No mailbox mutex is held while job-supplied code runs.
                let ok = entry(&params, &mut result_bytes);
                trace!(
                    "worker {} finished a job: {}",
                    state.index,
                    if ok { "success" } else { "failure" }
                );

                let callback = if ok { on_success } else { on_fail };
                if let Some(callback) = callback {
                    results.store(callback, result_bytes);
                }
                state.finish();
            }
            None => thread::sleep(poll_interval),
        }
    }
}
