//! Callback sink that keeps the published bar sequence.

use barline_types::Bar;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records the bars delivered to a subscription.
///
/// Successive deliveries for the same bucket replace the last entry, so the
/// collected sequence holds one (latest) bar per bucket.
#[derive(Debug, Clone, Default)]
pub struct BarCollector {
    bars: Arc<Mutex<Vec<Bar>>>,
}

impl BarCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a callback feeding this collector.
    #[must_use]
    pub fn callback(&self) -> impl Fn(&Bar) + Send + Sync + 'static {
        let bars = Arc::clone(&self.bars);
        move |bar: &Bar| push(&mut bars.lock(), *bar)
    }

    /// Returns a copy of the collected bars.
    #[must_use]
    pub fn bars(&self) -> Vec<Bar> {
        self.bars.lock().clone()
    }

    /// Returns the most recent bar.
    #[must_use]
    pub fn last(&self) -> Option<Bar> {
        self.bars.lock().last().copied()
    }

    /// Returns the number of buckets collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.lock().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.lock().is_empty()
    }

    /// Removes and returns the collected bars.
    pub fn take(&self) -> Vec<Bar> {
        std::mem::take(&mut *self.bars.lock())
    }
}

fn push(bars: &mut Vec<Bar>, bar: Bar) {
    match bars.last_mut() {
        Some(last) if last.time_ms == bar.time_ms => *last = bar,
        Some(last) if last.time_ms > bar.time_ms => {}
        _ => bars.push(bar),
    }
}
