//! Pooled log entries and the pending-write queue

use std::collections::VecDeque;
use std::mem;

use parking_lot::{Condvar, Mutex};

use crate::core::level::Level;

/// One formatted log line in flight: header plus body in a single buffer.
/// `header` is the byte length of the header part, forwarded to the sink so
/// it can treat the two spans differently.
pub(crate) struct Entry {
    pub(crate) buf: Vec<u8>,
    pub(crate) level: Level,
    pub(crate) header: usize,
}

impl Entry {
    fn new() -> Self {
        Entry {
            buf: Vec::new(),
            level: Level::Info,
            header: 0,
        }
    }
}

/// Buffers over this many bytes are dropped instead of pooled, so one
/// oversized record cannot pin memory for the life of the process.
const MAX_POOLED_ENTRY: usize = 256;

/// LIFO free-stack of entries. Acquire always yields an empty buffer;
/// release keeps small buffers for reuse.
pub(crate) struct EntryPool {
    free: Mutex<Vec<Entry>>,
}

impl EntryPool {
    pub(crate) const fn new() -> Self {
        EntryPool {
            free: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Entry {
        let recycled = self.free.lock().pop();
        match recycled {
            Some(mut e) => {
                e.buf.clear();
                e.header = 0;
                e
            }
            None => Entry::new(),
        }
    }

    pub(crate) fn release(&self, e: Entry) {
        if e.buf.len() > MAX_POOLED_ENTRY {
            return;
        }
        self.free.lock().push(e);
    }
}

/// FIFO of entries awaiting the consumer thread. `push` notifies only on
/// the empty-to-nonempty transition; control signals wake the consumer via
/// [`notify`](EntryQueue::notify) after enqueueing on their channel.
pub(crate) struct EntryQueue {
    inner: Mutex<VecDeque<Entry>>,
    cond: Condvar,
}

impl EntryQueue {
    pub(crate) fn new() -> Self {
        EntryQueue {
            inner: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    /// Appends an entry and returns the new queue size. The consumer is
    /// woken only on the empty-to-nonempty transition.
    pub(crate) fn push(&self, e: Entry) -> usize {
        let mut q = self.inner.lock();
        q.push_back(e);
        if q.len() == 1 {
            self.cond.notify_one();
        }
        q.len()
    }

    /// Detaches the whole pending chain in O(1).
    pub(crate) fn pop_all(&self) -> VecDeque<Entry> {
        mem::take(&mut *self.inner.lock())
    }

    /// Blocks until the queue is nonempty or `signal_pending` reports a
    /// control message, then detaches whatever is queued (possibly
    /// nothing). The predicate re-check on every wakeup makes missed
    /// notifications harmless.
    pub(crate) fn wait_pop_all(&self, signal_pending: impl Fn() -> bool) -> VecDeque<Entry> {
        let mut q = self.inner.lock();
        while q.is_empty() && !signal_pending() {
            self.cond.wait(&mut q);
        }
        mem::take(&mut *q)
    }

    /// Wakes the consumer after a control signal was enqueued. Must take
    /// the queue lock: a bare notify can fire between the consumer's
    /// predicate check and its park, and the signal sleeps until the next
    /// push.
    pub(crate) fn notify(&self) {
        let _queue = self.inner.lock();
        self.cond.notify_one();
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
