//! Error taxonomy for submission and owner-thread operations.

use crate::Priority;

/// Errors reported by [`submit`](crate::JobScheduler::submit) and by
/// descriptor construction.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The target priority tier is at capacity; the job was not enqueued.
    #[error("the {0:?} priority queue is full")]
    QueueFull(Priority),

    /// The scheduler has been shut down and accepts no further work.
    #[error("scheduler is shut down")]
    ShutDown,

    /// Copying a parameter buffer or reserving a result buffer failed.
    #[error("allocation of a {0}-byte job buffer failed")]
    AllocFailed(usize),
}

/// Errors reported by [`update`](crate::JobScheduler::update).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// `update` was called from a thread other than the one that constructed
    /// the scheduler. Dispatch and callback delivery belong to the owner
    /// thread only.
    #[error("update() called off the owner thread")]
    NotOwnerThread,
}
