//! Replay command implementation.
//!
//! Streams a recorded tick file through a live [`Engine`], collecting one bar
//! series per symbol and resolution, then reports continuity and writes the
//! series out.

use crate::display::{Format, bar_file_name, write_bars};
use anyhow::{Context, Result, bail};
use barline_lib::ContinuityViolation;
use barline_lib::prelude::*;
use csv_async::{AsyncReaderBuilder, StringRecord, Trim};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// What to build from the replayed ticks.
#[derive(Debug, Clone)]
pub(crate) struct ReplayOptions {
    pub(crate) resolutions: Vec<String>,
    pub(crate) symbol: Option<String>,
    pub(crate) validate_continuity: bool,
}

/// Bars built for one subscription.
#[derive(Debug)]
pub(crate) struct Series {
    pub(crate) symbol: String,
    pub(crate) resolution: Resolution,
    pub(crate) bars: Vec<Bar>,
    pub(crate) violations: Vec<ContinuityViolation>,
}

/// Outcome of a replay.
#[derive(Debug)]
pub(crate) struct ReplayReport {
    pub(crate) rows_read: u64,
    pub(crate) rows_skipped: u64,
    pub(crate) series: Vec<Series>,
    pub(crate) status: EngineStatus,
}

/// Replay `input` and write or summarize the resulting bars.
pub(crate) async fn replay(
    input: &Path,
    options: &ReplayOptions,
    output_dir: Option<PathBuf>,
    format: Format,
    print_status: bool,
    quiet: bool,
) -> Result<()> {
    let total_bytes = tokio::fs::metadata(input)
        .await
        .with_context(|| format!("Cannot read tick file: {}", input.display()))?
        .len();

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total_bytes);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
            )?
            .progress_chars("=>-"),
        );
        pb.set_message(input.display().to_string());
        pb
    };

    let report = replay_file(input, options, &progress).await?;
    progress.finish_with_message(format!(
        "Replayed {} ticks ({} skipped)",
        report.rows_read - report.rows_skipped,
        report.rows_skipped
    ));

    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory: {}", dir.display()))?;
        for series in &report.series {
            let path = dir.join(bar_file_name(&series.symbol, series.resolution, format));
            write_bars(&series.bars, &path, format)?;
            info!(path = %path.display(), bars = series.bars.len(), "wrote bars");
        }
    }

    if !quiet {
        print_summary(&report);
        if let Some(dir) = &output_dir {
            println!("\nOutput written to: {}", dir.display());
        }
    }

    if print_status {
        println!("{}", serde_json::to_string_pretty(&report.status)?);
    }

    Ok(())
}

fn print_summary(report: &ReplayReport) {
    println!(
        "{:<20} {:<6} {:>8} {:>22} {:>22} {:>6}",
        "SYMBOL", "RES", "BARS", "FIRST", "LAST", "GAPS"
    );
    println!("{}", "-".repeat(90));

    for series in &report.series {
        let time_of = |bar: Option<&Bar>| {
            bar.and_then(Bar::time)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<20} {:<6} {:>8} {:>22} {:>22} {:>6}",
            series.symbol,
            series.resolution.code(),
            series.bars.len(),
            time_of(series.bars.first()),
            time_of(series.bars.last()),
            series.violations.len()
        );
    }

    let stats = &report.status.stats;
    println!(
        "\nTicks: {} published, {} dropped, {} late",
        stats.ticks_published, stats.ticks_dropped, stats.late_ticks
    );
}

/// Replay `input` through a fresh engine and collect the bar series.
pub(crate) async fn replay_file(
    input: &Path,
    options: &ReplayOptions,
    progress: &ProgressBar,
) -> Result<ReplayReport> {
    let mut replayer = Replayer::new(options)?;
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Cannot open tick file: {}", input.display()))?;

    match TickSource::detect(input)? {
        TickSource::Csv => read_csv(file, &mut replayer, progress).await?,
        TickSource::Ndjson => read_ndjson(file, &mut replayer, progress).await?,
    }

    Ok(replayer.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickSource {
    Csv,
    Ndjson,
}

impl TickSource {
    fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("ndjson" | "jsonl" | "json") => Ok(Self::Ndjson),
            _ => bail!(
                "Cannot infer tick format of {}; expected .csv, .ndjson or .jsonl",
                path.display()
            ),
        }
    }
}

/// Feeds ticks into an engine, subscribing to each symbol on first sight.
struct Replayer {
    engine: Engine,
    resolutions: Vec<(String, Resolution)>,
    default_symbol: Option<String>,
    filter: Option<Symbol>,
    validator: Option<ContinuityValidator>,
    collectors: BTreeMap<(String, Resolution), BarCollector>,
    rows_read: u64,
    rows_skipped: u64,
}

impl Replayer {
    fn new(options: &ReplayOptions) -> Result<Self> {
        let config = EngineConfig::from_env().with_continuity_checks(options.validate_continuity);

        let mut seen = BTreeSet::new();
        let resolutions: Vec<_> = options
            .resolutions
            .iter()
            .map(|code| (code.clone(), Resolution::parse_or_default(code)))
            .filter(|(_, resolution)| seen.insert(*resolution))
            .collect();
        if resolutions.is_empty() {
            bail!("At least one resolution is required");
        }

        let filter = options
            .symbol
            .as_deref()
            .map(Symbol::parse)
            .transpose()
            .context("Invalid --symbol")?;

        Ok(Self {
            engine: Engine::new(config),
            resolutions,
            default_symbol: options.symbol.clone(),
            filter,
            validator: config
                .validate_continuity
                .then(|| ContinuityValidator::with_tolerance_ms(config.continuity_tolerance_ms)),
            collectors: BTreeMap::new(),
            rows_read: 0,
            rows_skipped: 0,
        })
    }

    fn skip(&mut self, line: u64, err: &anyhow::Error) {
        self.rows_skipped += 1;
        warn!(line, error = %err, "skipping malformed tick row");
    }

    fn on_tick(&mut self, mut tick: Tick) {
        if tick.symbol.trim().is_empty()
            && let Some(default) = &self.default_symbol
        {
            tick.symbol.clone_from(default);
        }

        // Unparseable symbols go straight to the engine, which counts the drop.
        if let Ok(symbol) = Symbol::parse(&tick.symbol) {
            if self.filter.as_ref().is_some_and(|f| *f != symbol) {
                return;
            }
            self.ensure_subscribed(&symbol);
        }

        self.engine.ingest(&tick);
    }

    fn ensure_subscribed(&mut self, symbol: &Symbol) {
        for (code, resolution) in &self.resolutions {
            let key = (symbol.as_str().to_string(), *resolution);
            if self.collectors.contains_key(&key) {
                continue;
            }
            let collector = BarCollector::new();
            match self
                .engine
                .subscribe(symbol.as_str(), code, collector.callback(), None)
            {
                Ok(_) => {
                    self.collectors.insert(key, collector);
                }
                Err(err) => warn!(symbol = %symbol, error = %err, "cannot subscribe"),
            }
        }
    }

    fn finish(self) -> ReplayReport {
        let series = self
            .collectors
            .into_iter()
            .map(|((symbol, resolution), collector)| {
                let bars = collector.take();
                let violations: Vec<_> = self
                    .validator
                    .map(|v| v.violations(&bars, resolution).collect())
                    .unwrap_or_default();
                Series {
                    symbol,
                    resolution,
                    bars,
                    violations,
                }
            })
            .collect();

        ReplayReport {
            rows_read: self.rows_read,
            rows_skipped: self.rows_skipped,
            series,
            status: self.engine.status(),
        }
    }
}

/// Column positions of a tick CSV header.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    price: usize,
    symbol: Option<usize>,
    bid: Option<usize>,
    ask: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };

        let timestamp = find(&["timestamp_ms", "timestampms", "timestamp", "time"])
            .context("Tick CSV needs a timestamp column")?;
        let price = find(&["price", "last", "close"]).context("Tick CSV needs a price column")?;

        Ok(Self {
            timestamp,
            price,
            symbol: find(&["symbol", "ticker"]),
            bid: find(&["bid"]),
            ask: find(&["ask"]),
            high: find(&["high"]),
            low: find(&["low"]),
            volume: find(&["volume", "size", "qty"]),
        })
    }

    fn parse(&self, record: &StringRecord) -> Result<Tick> {
        let field = |index: usize| record.get(index).unwrap_or("");
        let optional = |index: Option<usize>| -> Result<Option<f64>> {
            match index.map(field) {
                None | Some("") => Ok(None),
                Some(raw) => raw
                    .parse()
                    .map(Some)
                    .with_context(|| format!("Invalid number: {raw}")),
            }
        };

        let price: f64 = field(self.price)
            .parse()
            .with_context(|| format!("Invalid price: {}", field(self.price)))?;
        let mut tick = Tick::new(
            self.symbol.map(field).unwrap_or_default(),
            parse_timestamp(field(self.timestamp))?,
            price,
        );
        tick.bid = optional(self.bid)?;
        tick.ask = optional(self.ask)?;
        tick.high = optional(self.high)?;
        tick.low = optional(self.low)?;
        tick.volume = optional(self.volume)?;
        Ok(tick)
    }
}

/// Epoch milliseconds, or an RFC 3339 timestamp.
fn parse_timestamp(raw: &str) -> Result<i64> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.timestamp_millis())
        .with_context(|| format!("Invalid timestamp: {raw}"))
}

async fn read_csv(
    file: tokio::fs::File,
    replayer: &mut Replayer,
    progress: &ProgressBar,
) -> Result<()> {
    let mut reader = AsyncReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .create_reader(file);
    let columns = Columns::from_headers(reader.headers().await?)?;
    let mut records = reader.records();

    while let Some(record) = records.next().await {
        replayer.rows_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err.position().map_or(replayer.rows_read, |p| p.line());
                replayer.skip(line, &err.into());
                continue;
            }
        };
        let line = record.position().map_or(replayer.rows_read, |p| p.line());
        match columns.parse(&record) {
            Ok(tick) => replayer.on_tick(tick),
            Err(err) => replayer.skip(line, &err),
        }
        if let Some(position) = record.position() {
            progress.set_position(position.byte());
        }
    }

    Ok(())
}

async fn read_ndjson(
    file: tokio::fs::File,
    replayer: &mut Replayer,
    progress: &ProgressBar,
) -> Result<()> {
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        progress.inc(line.len() as u64 + 1);
        if line.trim().is_empty() {
            continue;
        }
        replayer.rows_read += 1;
        match serde_json::from_str::<Tick>(&line) {
            Ok(tick) => replayer.on_tick(tick),
            Err(err) => replayer.skip(line_number, &err.into()),
        }
    }

    Ok(())
}
