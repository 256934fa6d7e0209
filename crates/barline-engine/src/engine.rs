//! Public entry point tying registry, dispatch and batching together.

use barline_aggregate::{ContinuityValidator, bucket_start_ms};
use barline_types::{Bar, Quote, Resolution, Result, Symbol, Tick};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    BatchScheduler, DispatchStatsSnapshot, Dispatcher, EngineConfig, SubscriptionId,
    SubscriptionRegistry,
};

/// Read-only diagnostic snapshot of an [`Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Number of active subscriptions.
    pub subscription_count: usize,
    /// Active subscriptions per symbol.
    pub per_symbol_counts: BTreeMap<String, usize>,
    /// Resolutions with at least one subscription.
    pub resolutions: BTreeSet<Resolution>,
    /// Quotes waiting for the next store commit.
    pub pending_quotes: usize,
    /// Dispatch counters.
    pub stats: DispatchStatsSnapshot,
}

/// Real-time bar engine.
///
/// Owns its subscriptions; several engines can coexist in one process.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    dispatcher: Dispatcher,
    quotes: Option<BatchScheduler<String, Quote>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine with an empty registry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, Arc::new(SubscriptionRegistry::new()))
    }

    /// Creates an engine over an existing registry.
    #[must_use]
    pub fn with_registry(config: EngineConfig, registry: Arc<SubscriptionRegistry>) -> Self {
        let validator = config
            .validate_continuity
            .then(|| ContinuityValidator::with_tolerance_ms(config.continuity_tolerance_ms));
        Self {
            config,
            dispatcher: Dispatcher::new(registry, validator),
            quotes: None,
        }
    }

    /// Feeds the latest quote of every published symbol into `quotes`.
    #[must_use]
    pub fn with_quote_store(mut self, quotes: BatchScheduler<String, Quote>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the subscription registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriptionRegistry> {
        self.dispatcher.registry()
    }

    /// Returns the quote batch scheduler, if one is attached.
    #[must_use]
    pub const fn quotes(&self) -> Option<&BatchScheduler<String, Quote>> {
        self.quotes.as_ref()
    }

    /// Registers a callback for bars of `symbol` at `resolution`.
    ///
    /// Unknown resolution codes fall back to one minute. A `seed` bar, such
    /// as the last bar of previously fetched history, makes the first live
    /// bar open at the seed's close. The seed is snapped to the start of its
    /// bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if `symbol` cannot be parsed.
    pub fn subscribe(
        &self,
        symbol: &str,
        resolution: &str,
        callback: impl Fn(&Bar) + Send + Sync + 'static,
        seed: Option<Bar>,
    ) -> Result<SubscriptionId> {
        let symbol = Symbol::parse(symbol)?;
        let resolved = Resolution::lookup(resolution).unwrap_or_else(|| {
            warn!(resolution, fallback = %Resolution::default(), "unknown resolution, using fallback");
            Resolution::default()
        });

        let seed = seed.map(|bar| Bar {
            time_ms: bucket_start_ms(bar.time_ms, resolved),
            ..bar
        });
        let id = SubscriptionId::new();
        self.registry()
            .add(id, symbol.clone(), resolved, seed, Arc::new(callback));
        debug!(subscription = %id, symbol = %symbol, resolution = %resolved, seeded = seed.is_some(), "subscribed");
        Ok(id)
    }

    /// Removes a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(subscription) = self.registry().remove(id) {
            self.dispatcher.release_symbol(&subscription.symbol);
            debug!(subscription = %id, "unsubscribed");
        }
    }

    /// Ingests one tick for `symbol`.
    ///
    /// Ticks with an unparseable symbol or invalid prices are logged and
    /// dropped; nothing is ever returned to the caller.
    pub fn publish_tick(&self, symbol: &str, tick: &Tick) {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(err) => {
                self.dispatcher.stats().record_dropped();
                warn!(error = %err, "dropping tick with unparseable symbol");
                return;
            }
        };

        if let Err(err) = tick.validate() {
            self.dispatcher.stats().record_dropped();
            warn!(symbol = %symbol, error = %err, "dropping invalid tick");
            return;
        }

        self.dispatcher.publish_tick(&symbol, tick);

        if let Some(quotes) = &self.quotes {
            quotes.record(symbol.as_str().to_string(), tick.quote());
        }
    }

    /// Ingests a tick routed by its own `symbol` field.
    pub fn ingest(&self, tick: &Tick) {
        self.publish_tick(&tick.symbol, tick);
    }

    /// Returns a diagnostic snapshot.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        let registry = self.registry();
        EngineStatus {
            subscription_count: registry.len(),
            per_symbol_counts: registry.per_symbol_counts(),
            resolutions: registry.resolutions(),
            pending_quotes: self.quotes.as_ref().map_or(0, BatchScheduler::pending),
            stats: self.dispatcher.stats().snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BarCollector, ManualScheduler};
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    fn tick(t: i64, price: f64) -> Tick {
        Tick::new("EURUSD", t, price)
    }

    #[test]
    fn test_minute_scenario_end_to_end() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        engine.subscribe("EURUSD", "1", collector.callback(), None).unwrap();

        engine.publish_tick("EURUSD", &tick(0, 1.1000));
        engine.publish_tick("EURUSD", &tick(30_000, 1.1005));
        engine.publish_tick("EURUSD", &tick(61_000, 1.0998));

        let bars = collector.bars();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0], Bar::new(0, 1.1000, 1.1005, 1.1000, 1.1005, 0.0));
        assert_eq!(bars[1].time_ms, 60_000);
        assert_relative_eq!(bars[1].open, 1.1005);
        assert_relative_eq!(bars[1].high, 1.1005);
        assert_relative_eq!(bars[1].low, 1.0998);
        assert_relative_eq!(bars[1].close, 1.0998);
    }

    #[test]
    fn test_symbols_are_normalized() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        engine.subscribe(" eurusd ", "5", collector.callback(), None).unwrap();
        engine.publish_tick("EURUSD", &tick(0, 1.0));
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_invalid_symbol_is_rejected_at_subscribe() {
        let engine = Engine::default();
        assert!(engine.subscribe("EUR USD", "1", |_: &Bar| {}, None).is_err());
        assert_eq!(engine.status().subscription_count, 0);
    }

    #[test]
    fn test_bad_ticks_are_dropped() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        engine.subscribe("EURUSD", "1", collector.callback(), None).unwrap();

        engine.publish_tick("", &tick(0, 1.0));
        engine.publish_tick("EURUSD", &tick(0, f64::NAN));
        assert!(collector.is_empty());
        assert_eq!(engine.status().stats.ticks_dropped, 2);
    }

    #[test]
    fn test_unknown_resolution_falls_back_to_one_minute() {
        let engine = Engine::default();
        let id = engine.subscribe("EURUSD", "7", |_: &Bar| {}, None).unwrap();
        assert_eq!(engine.registry().get(id).unwrap().resolution, Resolution::Minute1);
    }

    #[test]
    fn test_unsubscribe_is_immediate_and_idempotent() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        let id = engine.subscribe("EURUSD", "1", collector.callback(), None).unwrap();

        engine.publish_tick("EURUSD", &tick(0, 1.0));
        engine.unsubscribe(id);
        engine.unsubscribe(id);
        engine.publish_tick("EURUSD", &tick(60_000, 1.1));

        assert_eq!(collector.len(), 1);
        assert_eq!(engine.status().subscription_count, 0);
        assert_eq!(engine.dispatcher.lock_count(), 0);
    }

    #[test]
    fn test_ingest_routes_by_tick_symbol() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        engine.subscribe("BTC/USD", "1D", collector.callback(), None).unwrap();
        engine.ingest(&Tick::new("btc/usd", 90_000_000, 42_000.0));

        let bar = collector.last().unwrap();
        assert_eq!(bar.time_ms, 86_400_000);
    }

    #[test]
    fn test_status_reports_counts_and_resolutions() {
        let engine = Engine::default();
        engine.subscribe("EURUSD", "1", |_: &Bar| {}, None).unwrap();
        engine.subscribe("EURUSD", "240", |_: &Bar| {}, None).unwrap();
        engine.subscribe("GBPUSD", "1", |_: &Bar| {}, None).unwrap();

        let status = engine.status();
        assert_eq!(status.subscription_count, 3);
        assert_eq!(status.per_symbol_counts.get("EURUSD"), Some(&2));
        assert_eq!(
            status.resolutions.into_iter().collect::<Vec<_>>(),
            vec![Resolution::Minute1, Resolution::Hour4]
        );

        let json = serde_json::to_value(engine.status()).unwrap();
        assert_eq!(json["resolutions"], serde_json::json!(["1", "240"]));
    }

    #[test]
    fn test_quotes_are_coalesced_per_symbol() {
        let scheduler = Arc::new(ManualScheduler::new());
        let store: Arc<Mutex<Vec<HashMap<String, Quote>>>> = Arc::default();
        let sink = Arc::clone(&store);
        let quotes = BatchScheduler::new(scheduler.clone(), move |batch| sink.lock().push(batch));
        let engine = Engine::default().with_quote_store(quotes);

        engine.publish_tick("EURUSD", &tick(0, 1.10));
        engine.publish_tick("EURUSD", &tick(10, 1.11));
        engine.publish_tick("GBPUSD", &Tick::new("GBPUSD", 10, 1.27));
        assert_eq!(engine.status().pending_quotes, 2);

        scheduler.run_pending();
        let store = store.lock();
        assert_eq!(store.len(), 1);
        assert_relative_eq!(store[0]["EURUSD"].price, 1.11);
        assert_eq!(store[0]["GBPUSD"].timestamp_ms, 10);
    }

    #[test]
    fn test_seeded_subscription_stays_bucket_aligned() {
        let engine = Engine::default();
        let collector = BarCollector::new();
        let seed = Bar::new(61_500, 1.10, 1.12, 1.09, 1.11, 3.0);
        let id = engine
            .subscribe("EURUSD", "1", collector.callback(), Some(seed))
            .unwrap();
        assert_eq!(engine.registry().get(id).unwrap().last_bar.unwrap().time_ms, 60_000);

        engine.publish_tick("EURUSD", &tick(90_000, 1.115));
        engine.publish_tick("EURUSD", &tick(125_000, 1.12));

        let bars = collector.bars();
        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(|b| b.time_ms % 60_000 == 0));
        assert_relative_eq!(bars[0].open, 1.10);
        assert_relative_eq!(bars[0].volume, 3.0);
        assert_relative_eq!(bars[1].open, 1.115);
    }

    #[test]
    fn test_independent_engines_do_not_share_state() {
        let first = Engine::default();
        let second = Engine::default();
        first.subscribe("EURUSD", "1", |_: &Bar| {}, None).unwrap();
        assert_eq!(first.status().subscription_count, 1);
        assert_eq!(second.status().subscription_count, 0);
    }

    #[test]
    fn test_callback_can_publish_reentrantly() {
        let engine = Arc::new(Engine::default());
        let collector = BarCollector::new();
        engine.subscribe("EURUSD", "1", collector.callback(), None).unwrap();

        let echo = Arc::clone(&engine);
        engine
            .subscribe(
                "GBPUSD",
                "1",
                move |bar: &Bar| echo.publish_tick("EURUSD", &Tick::new("EURUSD", bar.time_ms, bar.close)),
                None,
            )
            .unwrap();

        engine.publish_tick("GBPUSD", &Tick::new("GBPUSD", 0, 1.27));
        assert_relative_eq!(collector.last().unwrap().close, 1.27);
    }
}
