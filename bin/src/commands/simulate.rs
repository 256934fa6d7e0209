//! Simulate command implementation.
//!
//! Drives an engine with a seeded random-walk feed and a frame-batched quote
//! board, then prints what the engine saw.

use anyhow::{Context, Result, bail};
use barline_lib::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;

/// Shape of the simulated feed.
#[derive(Debug, Clone)]
pub(crate) struct SimulateOptions {
    pub(crate) symbols: Vec<String>,
    pub(crate) resolutions: Vec<String>,
    pub(crate) ticks: usize,
    pub(crate) step_ms: i64,
    pub(crate) seed: u64,
    pub(crate) frame_ms: Option<u64>,
}

/// What the engine produced for a simulated feed.
#[derive(Debug, Serialize)]
pub(crate) struct SimulationReport {
    pub(crate) status: EngineStatus,
    /// Bars per `SYMBOL@resolution`.
    pub(crate) bars: BTreeMap<String, usize>,
    pub(crate) last_bars: BTreeMap<String, Bar>,
    pub(crate) quote_commits: u64,
    pub(crate) quotes: BTreeMap<String, Quote>,
}

/// Run a simulation and print its report as JSON.
pub(crate) async fn simulate(options: &SimulateOptions, quiet: bool) -> Result<()> {
    let start_ms = chrono::Utc::now().timestamp_millis();
    let report = run_simulation(options, start_ms).await?;
    if !quiet {
        info!(
            ticks = report.status.stats.ticks_published,
            commits = report.quote_commits,
            "simulation finished"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Random walk around a starting mid price.
#[derive(Debug)]
struct RandomWalk {
    symbol: String,
    price: f64,
    spread: f64,
}

impl RandomWalk {
    const MAX_STEP: f64 = 0.0005;

    fn new(symbol: String, price: f64) -> Self {
        Self {
            symbol,
            price,
            spread: price * 0.0001,
        }
    }

    fn next_tick(&mut self, rng: &mut StdRng, timestamp_ms: i64) -> Tick {
        let step = rng.random_range(-Self::MAX_STEP..=Self::MAX_STEP);
        self.price = (self.price * (1.0 + step)).max(f64::EPSILON);
        let half = self.spread / 2.0;
        Tick::new(self.symbol.clone(), timestamp_ms, self.price)
            .with_bid_ask(self.price - half, self.price + half)
            .with_volume(rng.random_range(0.1..5.0))
    }
}

pub(crate) async fn run_simulation(options: &SimulateOptions, start_ms: i64) -> Result<SimulationReport> {
    if options.step_ms <= 0 {
        bail!("Tick step must be positive, got {} ms", options.step_ms);
    }

    let mut config = EngineConfig::from_env();
    if let Some(frame_ms) = options.frame_ms {
        config = config.with_frame_interval_ms(frame_ms);
    }

    let scheduler = TokioScheduler::from_current(config.frame_interval())
        .context("Simulation needs a Tokio runtime")?;
    let board: Arc<Mutex<BTreeMap<String, Quote>>> = Arc::default();
    let sink = Arc::clone(&board);
    let quotes = BatchScheduler::new(Arc::new(scheduler), move |batch: HashMap<String, Quote>| {
        sink.lock().extend(batch);
    });
    let engine = Engine::new(config).with_quote_store(quotes.clone());

    let mut seen = BTreeSet::new();
    let codes: Vec<_> = options
        .resolutions
        .iter()
        .filter(|code| seen.insert(Resolution::parse_or_default(code)))
        .collect();

    let mut collectors = BTreeMap::new();
    let mut walks = Vec::with_capacity(options.symbols.len());
    for (i, raw) in options.symbols.iter().enumerate() {
        let symbol = Symbol::parse(raw).with_context(|| format!("Invalid symbol: {raw}"))?;
        for code in &codes {
            let collector = BarCollector::new();
            engine.subscribe(symbol.as_str(), code, collector.callback(), None)?;
            let key = format!("{symbol}@{}", Resolution::parse_or_default(code));
            collectors.insert(key, collector);
        }
        walks.push(RandomWalk::new(symbol.to_string(), 1.0 + i as f64 * 0.25));
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut timestamp_ms = start_ms;
    for _ in 0..options.ticks {
        for walk in &mut walks {
            let tick = walk.next_tick(&mut rng, timestamp_ms);
            engine.ingest(&tick);
        }
        timestamp_ms = timestamp_ms.saturating_add(options.step_ms);
        tokio::task::yield_now().await;
    }

    // Let the last armed frame commit.
    tokio::time::sleep(config.frame_interval() * 2).await;

    let bars = collectors
        .iter()
        .map(|(key, collector)| (key.clone(), collector.len()))
        .collect();
    let last_bars = collectors
        .iter()
        .filter_map(|(key, collector)| collector.last().map(|bar| (key.clone(), bar)))
        .collect();
    let quotes_snapshot = board.lock().clone();

    Ok(SimulationReport {
        status: engine.status(),
        bars,
        last_bars,
        quote_commits: quotes.commit_count(),
        quotes: quotes_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ticks: usize) -> SimulateOptions {
        SimulateOptions {
            symbols: vec!["EURUSD".to_string(), "btc/usd".to_string()],
            resolutions: vec!["1".to_string(), "5".to_string()],
            ticks,
            step_ms: 1_000,
            seed: 42,
            frame_ms: Some(16),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_builds_aligned_bars() {
        let report = run_simulation(&options(600), 0).await.unwrap();

        assert_eq!(report.status.subscription_count, 4);
        assert_eq!(report.status.stats.ticks_published, 1_200);
        assert_eq!(report.status.stats.continuity_violations, 0);
        assert_eq!(report.bars["EURUSD@1"], 10);
        assert_eq!(report.bars["BTC/USD@5"], 2);
        assert!(report.last_bars.values().all(Bar::satisfies_bounds));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_positive_step_is_rejected() {
        for step_ms in [0, -1_000] {
            let options = SimulateOptions { step_ms, ..options(10) };
            assert!(run_simulation(&options, 0).await.is_err());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_step_saturates_instead_of_overflowing() {
        let options = SimulateOptions {
            step_ms: i64::MAX / 2,
            ..options(5)
        };
        let report = run_simulation(&options, 0).await.unwrap();

        assert_eq!(report.status.stats.ticks_published, 10);
        assert_eq!(report.status.stats.late_ticks, 0);
        assert!(report.last_bars.values().all(Bar::satisfies_bounds));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_board_holds_latest_quotes() {
        let report = run_simulation(&options(50), 0).await.unwrap();

        assert!(report.quote_commits >= 1);
        assert_eq!(report.status.pending_quotes, 0);
        assert_eq!(report.quotes.len(), 2);
        assert_eq!(report.quotes["EURUSD"].timestamp_ms, 49_000);
        let close = report.last_bars["EURUSD@1"].close;
        assert!((report.quotes["EURUSD"].price - close).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_same_walk() {
        let first = run_simulation(&options(120), 0).await.unwrap();
        let second = run_simulation(&options(120), 0).await.unwrap();
        assert_eq!(first.last_bars, second.last_bars);
    }
}
