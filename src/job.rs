//! Job descriptors and their construction.
//!
//! A descriptor bundles the work function with its parameter and result
//! buffers and the callbacks that report the outcome. The parameter bytes are
//! deep-copied when the descriptor is built, so the submitting code's stack
//! or heap can go away the moment `build` returns.

use crate::error::SubmitError;
use crate::{JobKind, Priority};

/// The work function. Runs on a worker thread with read access to the
/// parameter bytes and write access to the pre-allocated result bytes.
/// Returns `true` on success, `false` on failure.
pub type EntryFn = Box<dyn FnOnce(&[u8], &mut [u8]) -> bool + Send + 'static>;

/// A completion callback. Runs on the owner thread with the result bytes the
/// entry point left behind.
pub type CallbackFn = Box<dyn FnOnce(&[u8]) + Send + 'static>;

/// A unit of work: entry point, callbacks, owned byte buffers, routing tags.
///
/// Descriptors are created via [`JobDescriptor::builder`], move through the
/// scheduler by value, and are consumed by the worker that executes them.
pub struct JobDescriptor {
    pub(crate) kind: JobKind,
    pub(crate) priority: Priority,
    pub(crate) entry: EntryFn,
    pub(crate) on_success: Option<CallbackFn>,
    pub(crate) on_fail: Option<CallbackFn>,
    pub(crate) params: Box<[u8]>,
    pub(crate) results: Box<[u8]>,
}

impl JobDescriptor {
    /// Starts building a descriptor around `entry`.
    ///
    /// Defaults: kind `GENERAL`, priority `Normal`, empty parameter bytes,
    /// zero-length result buffer, no callbacks.
    pub fn builder<F>(entry: F) -> JobBuilder<'static>
    where
        F: FnOnce(&[u8], &mut [u8]) -> bool + Send + 'static,
    {
        JobBuilder {
            kind: JobKind::GENERAL,
            priority: Priority::Normal,
            entry: Box::new(entry),
            on_success: None,
            on_fail: None,
            params: &[],
            result_len: 0,
        }
    }

    /// The type bitmask used for worker-affinity routing.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// The tier this job is scheduled on.
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl std::fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("params", &self.params.len())
            .field("results", &self.results.len())
            .finish()
    }
}

/// Builder for [`JobDescriptor`].
pub struct JobBuilder<'a> {
    kind: JobKind,
    priority: Priority,
    entry: EntryFn,
    on_success: Option<CallbackFn>,
    on_fail: Option<CallbackFn>,
    params: &'a [u8],
    result_len: usize,
}

impl<'a> JobBuilder<'a> {
    /// Sets the type bitmask consulted against worker masks.
    pub fn kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the priority tier.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Parameter bytes for the entry point. Copied at [`build`](Self::build).
    pub fn params<'b>(self, params: &'b [u8]) -> JobBuilder<'b> {
        JobBuilder {
            kind: self.kind,
            priority: self.priority,
            entry: self.entry,
            on_success: self.on_success,
            on_fail: self.on_fail,
            params,
            result_len: self.result_len,
        }
    }

    /// Size of the result buffer handed to the entry point, allocated zeroed.
    pub fn result_len(mut self, len: usize) -> Self {
        self.result_len = len;
        self
    }

    /// Callback invoked on the owner thread when the entry point returns true.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&[u8]) + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Callback invoked on the owner thread when the entry point returns false.
    pub fn on_fail<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&[u8]) + Send + 'static,
    {
        self.on_fail = Some(Box::new(callback));
        self
    }

    /// Allocates the owned buffers and produces the descriptor.
    ///
    /// Buffer allocation goes through `try_reserve_exact`, so exhaustion
    /// surfaces as [`SubmitError::AllocFailed`] instead of aborting the
    /// process.
    pub fn build(self) -> Result<JobDescriptor, SubmitError> {
        let params = copy_bytes(self.params)?;
        let results = zeroed_bytes(self.result_len)?;
        Ok(JobDescriptor {
            kind: self.kind,
            priority: self.priority,
            entry: self.entry,
            on_success: self.on_success,
            on_fail: self.on_fail,
            params,
            results,
        })
    }
}

fn copy_bytes(src: &[u8]) -> Result<Box<[u8]>, SubmitError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| SubmitError::AllocFailed(src.len()))?;
    buf.extend_from_slice(src);
    Ok(buf.into_boxed_slice())
}

fn zeroed_bytes(len: usize) -> Result<Box<[u8]>, SubmitError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SubmitError::AllocFailed(len))?;
    buf.resize(len, 0);
    Ok(buf.into_boxed_slice())
}
