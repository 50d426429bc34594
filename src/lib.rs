//! # jobmill — fixed-size priority job scheduler
//!
//! A bounded pool of affinity-masked worker threads fed by a single-threaded
//! owner (typically an engine's main loop). Work is described by a
//! [`JobDescriptor`] — an entry point plus owned parameter/result byte
//! buffers — and every completion callback runs back on the owner thread,
//! never on a worker.
//!
//! ## Architecture
//!
//! - **Three bounded tiers** (LOW, NORMAL, HIGH), each a fixed-capacity ring
//!   with its own mutex. HIGH submissions bypass the queue entirely when an
//!   idle matching worker exists.
//! - **Workers** are plain OS threads with a single-slot mailbox; the mailbox
//!   is the busy/idle state. A worker only ever receives jobs whose kind
//!   bitmask intersects its own mask.
//! - **Result table**: workers deposit finished jobs' callbacks here;
//!   [`update`](JobScheduler::update) drains it once per tick on the owner
//!   thread.
//!
//! ## Example
//!
//! ```no_run
//! use jobmill::{JobDescriptor, JobKind, JobScheduler};
//!
//! let mut scheduler = JobScheduler::new(&[JobKind::GENERAL, JobKind::GENERAL]).unwrap();
//!
//! let job = JobDescriptor::builder(|params, results| {
//!     results[0] = params[0] * 2;
//!     true
//! })
//! .params(&[21])
//! .result_len(1)
//! .on_success(|results| println!("doubled: {}", results[0]))
//! .build()
//! .unwrap();
//!
//! scheduler.submit(job).unwrap();
//! loop {
//!     if scheduler.update().unwrap() > 0 {
//!         break;
//!     }
//! }
//! scheduler.shutdown();
//! ```

pub mod error;
pub mod job;
pub mod queue;
pub mod results;
pub mod scheduler;
pub mod worker;

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Job type bitmask matched against each worker's affinity mask.
    ///
    /// A job is only ever dispatched to a worker whose mask intersects the
    /// job's kind. Masks are fixed per worker at scheduler construction.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct JobKind: u32 {
        /// Generic CPU work; the default for new descriptors.
        const GENERAL = 1 << 0;
        /// GPU resource preparation (uploads, pipeline warmup).
        const GPU     = 1 << 1;
        /// Asset decoding (images, audio, meshes).
        const DECODE  = 1 << 2;
        /// Long-running batch compute.
        const COMPUTE = 1 << 3;
    }
}

impl Default for JobKind {
    fn default() -> Self {
        JobKind::GENERAL
    }
}

/// Scheduling tier. HIGH drains before NORMAL, NORMAL before LOW.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Tier scan order used by the dispatcher.
    pub(crate) const DISPATCH_ORDER: [Priority; 3] =
        [Priority::High, Priority::Normal, Priority::Low];

    /// Index into the tier array.
    pub(crate) fn tier(self) -> usize {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
        }
    }
}

pub use error::{SchedulerError, SubmitError};
pub use job::{JobBuilder, JobDescriptor};
pub use queue::BoundedQueue;
pub use results::OverflowPolicy;
pub use scheduler::{JobScheduler, SchedulerConfig, SubmitHandle};
