//! Fixed-capacity ring buffer used by the priority tiers.
//!
//! Capacity is set at construction and never changes. Head and tail indices
//! wrap modulo capacity; an explicit length counter removes the classic
//! empty-vs-full ambiguity of a two-index ring.

/// A bounded FIFO queue over a circular buffer.
///
/// All operations fail cleanly at the boundaries: `enqueue` on a full queue
/// hands the value back without mutating anything, and `dequeue`/`peek` on an
/// empty queue return `None` rather than reading stale slots.
pub struct BoundedQueue<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue that can hold at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        BoundedQueue {
            slots,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Appends `value` at the tail.
    ///
    /// Returns the value back untouched when the queue is full.
    pub fn enqueue(&mut self, value: T) -> Result<(), T> {
        if self.len == self.slots.len() {
            return Err(value);
        }
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.slots.len();
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the head element, or `None` when empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        value
    }

    /// Returns a reference to the head element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Reinserts `value` at the head, ahead of every queued element.
    ///
    /// The dispatcher uses this to restore FIFO order when a dequeued job
    /// loses the mailbox race against a direct high-priority submit.
    pub fn push_front(&mut self, value: T) -> Result<(), T> {
        if self.len == self.slots.len() {
            return Err(value);
        }
        self.head = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots[self.head] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no elements are queued.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when `len() == capacity()`.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// The fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drops every queued element.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.take();
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}
