//! Coalescing of high-frequency updates into one commit per frame.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

use crate::Scheduler;

/// Store-side function receiving each coalesced batch.
pub type CommitFn<K, V> = Arc<dyn Fn(HashMap<K, V>) + Send + Sync>;

/// Buffers the latest value per key and commits them together once per
/// scheduling boundary.
///
/// However many times a key is recorded between two boundaries, only its
/// last value is committed, and each armed boundary yields at most one
/// commit. Cloning yields another handle to the same buffer.
pub struct BatchScheduler<K, V> {
    inner: Arc<BatchInner<K, V>>,
}

struct BatchInner<K, V> {
    buffer: Mutex<HashMap<K, V>>,
    armed: AtomicBool,
    commits: AtomicU64,
    scheduler: Arc<dyn Scheduler>,
    commit: CommitFn<K, V>,
}

impl<K, V> Clone for BatchScheduler<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for BatchScheduler<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("pending", &self.inner.buffer.lock().len())
            .field("armed", &self.inner.armed.load(Ordering::Acquire))
            .field("commits", &self.inner.commits.load(Ordering::Relaxed))
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

impl<K, V> BatchScheduler<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    /// Creates a batch scheduler committing through `commit`.
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        commit: impl Fn(HashMap<K, V>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                buffer: Mutex::new(HashMap::new()),
                armed: AtomicBool::new(false),
                commits: AtomicU64::new(0),
                scheduler,
                commit: Arc::new(commit),
            }),
        }
    }

    /// Stores `value` as the latest value for `key` and arms a flush.
    pub fn record(&self, key: K, value: V) {
        self.inner.buffer.lock().insert(key, value);
        self.schedule_flush();
    }

    /// Arms a flush at the next boundary unless one is already armed.
    ///
    /// Returns true if this call armed the flush.
    pub fn schedule_flush(&self) -> bool {
        if self
            .inner
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let inner = Arc::clone(&self.inner);
        self.inner.scheduler.schedule_once(Box::new(move || {
            inner.flush();
        }));
        true
    }

    /// Commits the buffered values immediately.
    ///
    /// Returns the number of entries committed.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    /// Returns the number of keys waiting for the next commit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Returns true while a flush is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::Acquire)
    }

    /// Returns the number of commits performed so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.load(Ordering::Relaxed)
    }
}

impl<K, V> BatchInner<K, V> {
    fn flush(&self) -> usize {
        // Disarm before swapping so a record racing with the swap re-arms.
        self.armed.store(false, Ordering::Release);
        let batch = std::mem::take(&mut *self.buffer.lock());
        if batch.is_empty() {
            return 0;
        }

        let entries = batch.len();
        (self.commit)(batch);
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!(entries, "committed batch");
        entries
    }
}
