//! One-shot task scheduling on frame boundaries.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

/// A task run once at the next scheduling boundary.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks at the next scheduling boundary.
///
/// Implementations must never run the task synchronously inside
/// `schedule_once`; the caller may be holding state the task needs.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Arranges for `task` to run once at the next boundary.
    fn schedule_once(&self, task: Task);
}

/// Scheduler backed by a Tokio runtime with a fixed frame clock.
///
/// Boundaries are multiples of `frame` measured from the scheduler's
/// creation, so tasks armed at any point within a frame run together.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    frame: Duration,
    epoch: Instant,
}

impl TokioScheduler {
    /// Creates a scheduler on the given runtime.
    #[must_use]
    pub fn new(handle: Handle, frame: Duration) -> Self {
        Self {
            handle,
            frame: frame.max(Duration::from_millis(1)),
            epoch: Instant::now(),
        }
    }

    /// Creates a scheduler on the runtime of the calling task.
    ///
    /// Returns `None` when called outside a Tokio runtime.
    #[must_use]
    pub fn from_current(frame: Duration) -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self::new(handle, frame))
    }

    /// Returns the frame length.
    #[must_use]
    pub const fn frame(&self) -> Duration {
        self.frame
    }

    /// Returns the first frame boundary strictly after `now`.
    fn next_boundary(&self, now: Instant) -> Instant {
        let frame_nanos = self.frame.as_nanos();
        let elapsed = now.saturating_duration_since(self.epoch).as_nanos();
        let frames = elapsed / frame_nanos + 1;
        let offset = u64::try_from(frames * frame_nanos).unwrap_or(u64::MAX);
        self.epoch + Duration::from_nanos(offset)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, task: Task) {
        let deadline = self.next_boundary(Instant::now());
        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task();
        });
    }
}

/// Scheduler whose boundaries are driven by the caller.
///
/// Tasks queue up until [`run_pending`](Self::run_pending) is called, which
/// makes frame boundaries explicit for single-threaded hosts and tests.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<Task>>,
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs every task queued so far and returns how many ran.
    ///
    /// Tasks scheduled while running are kept for the next call.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, task: Task) {
        self.queue.lock().push(task);
    }
}
