//! Completion table bridging worker threads back to the owner thread.
//!
//! Workers deposit a finished job's callback and result bytes here; the
//! owner's `update` drains the table and runs every callback on its own
//! thread. The table is a fixed array of optional slots guarded by one mutex.
//! A `None` slot is free, a `Some` slot holds an undelivered completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::job::CallbackFn;

/// What to do when a completion arrives and every slot is occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Discard the incoming completion. Every drop is counted and logged.
    #[default]
    DropNewest,
    /// Evict the completion in the lowest occupied slot (the one that would
    /// have been delivered first) to make room for the incoming one.
    DropOldest,
    /// Extend the table. The growth is permanent for the scheduler's lifetime.
    Grow,
}

/// One undelivered completion: the resolved callback plus the result bytes
/// the entry point produced. The buffer is moved in, not copied; the worker
/// has no further use for it.
pub(crate) struct ResultEntry {
    callback: CallbackFn,
    bytes: Box<[u8]>,
}

impl ResultEntry {
    /// Runs the callback with the stored result bytes. Owner thread only.
    pub(crate) fn invoke(self) {
        (self.callback)(&self.bytes);
    }
}

pub(crate) struct ResultTable {
    slots: Mutex<Vec<Option<ResultEntry>>>,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl ResultTable {
    pub(crate) fn new(slot_count: usize, policy: OverflowPolicy) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, || None);
        ResultTable {
            slots: Mutex::new(slots),
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Deposits a completion. Called from worker threads.
    ///
    /// Returns false when the completion was discarded under
    /// [`OverflowPolicy::DropNewest`].
    pub(crate) fn store(&self, callback: CallbackFn, bytes: Box<[u8]>) -> bool {
        let entry = ResultEntry { callback, bytes };
        let mut slots = self.slots.lock().unwrap();

        if let Some(slot) = slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
            return true;
        }

        match self.policy {
            OverflowPolicy::DropNewest => {
                drop(slots);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("result table full; dropping newest completion");
                false
            }
            OverflowPolicy::DropOldest => {
                // Table is full, so slot 0 is occupied.
                slots[0] = Some(entry);
                drop(slots);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("result table full; evicted oldest completion");
                true
            }
            OverflowPolicy::Grow => {
                slots.push(Some(entry));
                true
            }
        }
    }

    /// Removes every occupied entry in slot-index order.
    ///
    /// Entries are moved out under the lock and invoked by the caller after
    /// it is released, so no callback ever runs while the table is locked.
    pub(crate) fn take_completed(&self) -> Vec<ResultEntry> {
        let mut slots = self.slots.lock().unwrap();
        slots.iter_mut().filter_map(|slot| slot.take()).collect()
    }

    /// Number of undelivered completions.
    pub(crate) fn pending(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    /// Completions lost to overflow since construction.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
