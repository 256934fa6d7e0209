//! Routing of ticks to subscriptions.

use barline_aggregate::{BarBuilder, BarChange, ContinuityValidator};
use barline_types::{Bar, Symbol, Tick};
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace};

use crate::{Subscription, SubscriptionRegistry};

/// Running counters kept by a [`Dispatcher`].
#[derive(Debug, Default)]
pub struct DispatchStats {
    ticks_published: AtomicU64,
    ticks_dropped: AtomicU64,
    bars_delivered: AtomicU64,
    late_ticks: AtomicU64,
    callback_failures: AtomicU64,
    continuity_violations: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    /// Ticks routed to the dispatcher.
    pub ticks_published: u64,
    /// Ticks dropped before dispatch (bad symbol or invalid prices).
    pub ticks_dropped: u64,
    /// Callback invocations that returned normally.
    pub bars_delivered: u64,
    /// Per-subscription tick applications that were out of order.
    pub late_ticks: u64,
    /// Callback invocations that panicked.
    pub callback_failures: u64,
    /// Bucket changes that skipped or misaligned an interval.
    pub continuity_violations: u64,
}

impl DispatchStats {
    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            ticks_published: self.ticks_published.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            bars_delivered: self.bars_delivered.load(Ordering::Relaxed),
            late_ticks: self.late_ticks.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            continuity_violations: self.continuity_violations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fans a tick out to every subscription on its symbol.
///
/// Dispatch for one symbol is serialized so that each subscription sees its
/// ticks one at a time, in publish order. Different symbols dispatch in
/// parallel. A callback may publish again on the same thread without
/// deadlocking.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    validator: Option<ContinuityValidator>,
    symbol_locks: Mutex<HashMap<Symbol, Arc<ReentrantMutex<()>>>>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    ///
    /// With a validator, every bucket change is checked for continuity.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>, validator: Option<ContinuityValidator>) -> Self {
        Self {
            registry,
            validator,
            symbol_locks: Mutex::new(HashMap::new()),
            stats: DispatchStats::default(),
        }
    }

    /// Returns the dispatcher's counters.
    #[must_use]
    pub const fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Returns the registry this dispatcher routes through.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Applies `tick` to every subscription on `symbol` and invokes callbacks.
    ///
    /// Returns the number of callbacks that completed normally. A panicking
    /// callback is logged and counted; the remaining subscriptions still
    /// receive their bars.
    pub fn publish_tick(&self, symbol: &Symbol, tick: &Tick) -> usize {
        DispatchStats::bump(&self.stats.ticks_published);
        if !self.registry.contains_symbol(symbol) {
            return 0;
        }

        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock();

        let mut delivered = 0;
        for subscription in self.registry.for_symbol(symbol) {
            if self.deliver(&subscription, tick) {
                delivered += 1;
            }
        }
        delivered
    }

    fn symbol_lock(&self, symbol: &Symbol) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.symbol_locks.lock();
        Arc::clone(locks.entry(symbol.clone()).or_default())
    }

    /// Drops the dispatch lock of `symbol` once nothing watches it and no
    /// publish holds it.
    pub fn release_symbol(&self, symbol: &Symbol) {
        let mut locks = self.symbol_locks.lock();
        let idle = locks
            .get(symbol)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle && !self.registry.contains_symbol(symbol) {
            locks.remove(symbol);
            trace!(symbol = %symbol, "released dispatch lock");
        }
    }

    /// Number of symbols with a live dispatch lock.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.symbol_locks.lock().len()
    }

    fn deliver(&self, subscription: &Subscription, tick: &Tick) -> bool {
        // Read-modify-write against the live entry so a nested publish from a
        // callback is never overwritten with a stale bar.
        let applied = self.registry.update(subscription.id, |live| {
            let previous = live.last_bar;
            let (bar, change) = BarBuilder::apply(tick, previous.as_ref(), live.resolution);
            live.last_bar = Some(bar);
            (previous, bar, change)
        });

        let Some((previous, bar, change)) = applied else {
            debug!(subscription = %subscription.id, "subscription removed during dispatch");
            return false;
        };

        match change {
            BarChange::Late => DispatchStats::bump(&self.stats.late_ticks),
            BarChange::Rolled => self.check_continuity(subscription, previous, bar),
            BarChange::Opened | BarChange::Updated => {}
        }

        trace!(
            subscription = %subscription.id,
            symbol = %subscription.symbol,
            resolution = %subscription.resolution,
            time_ms = bar.time_ms,
            close = bar.close,
            "delivering bar"
        );

        let callback = Arc::clone(&subscription.callback);
        match catch_unwind(AssertUnwindSafe(|| callback(&bar))) {
            Ok(()) => {
                DispatchStats::bump(&self.stats.bars_delivered);
                true
            }
            Err(payload) => {
                DispatchStats::bump(&self.stats.callback_failures);
                error!(
                    subscription = %subscription.id,
                    symbol = %subscription.symbol,
                    panic = panic_message(payload.as_ref()),
                    "bar callback panicked"
                );
                false
            }
        }
    }

    fn check_continuity(&self, subscription: &Subscription, previous: Option<Bar>, bar: Bar) {
        let (Some(validator), Some(previous)) = (self.validator, previous) else {
            return;
        };
        if !validator.validate(&[previous, bar], subscription.resolution) {
            DispatchStats::bump(&self.stats.continuity_violations);
            debug!(
                subscription = %subscription.id,
                symbol = %subscription.symbol,
                "continuity gap recorded"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
