//! Real-time tick to OHLCV bar engine.
//!
//! This is a facade crate that re-exports functionality from the barline
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use barline_lib::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scheduler = Arc::new(TokioScheduler::from_current(Duration::from_millis(16)).unwrap());
//!     let quotes = BatchScheduler::new(scheduler, |batch| println!("{} quotes", batch.len()));
//!     let engine = Engine::new(EngineConfig::from_env()).with_quote_store(quotes);
//!
//!     let id = engine.subscribe("BTC/USD", "60", |bar: &Bar| println!("{bar:?}"), None)?;
//!     engine.publish_tick("BTC/USD", &Tick::new("BTC/USD", 1_700_000_000_000, 37_000.0));
//!     engine.unsubscribe(id);
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barline/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use barline_types::*;

// Re-export bar building
pub use barline_aggregate::{
    BarBuilder, BarChange, ContinuityValidator, ContinuityViolation, bucket_start,
    bucket_start_for_code, bucket_start_ms,
};

// Re-export the engine
#[cfg(feature = "engine")]
pub use barline_engine::{
    BarCallback, BarCollector, BatchScheduler, CommitFn, DispatchStats, DispatchStatsSnapshot,
    Dispatcher, Engine, EngineConfig, EngineStatus, ManualScheduler, Scheduler, Subscription,
    SubscriptionId, SubscriptionRegistry, Task, TokioScheduler,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use barline_format::{
    CsvFormatter, FormatError, Formatter, JsonFormatter, JsonStyle, OutputFormat, formatter_for,
};

/// Prelude module for convenient imports.
///
/// ```
/// use barline_lib::prelude::*;
/// ```
pub mod prelude {
    pub use barline_types::{Bar, BarlineError, Quote, Resolution, Result, Symbol, Tick};

    pub use barline_aggregate::{BarBuilder, ContinuityValidator, bucket_start};

    #[cfg(feature = "engine")]
    pub use barline_engine::{
        BarCollector, BatchScheduler, Engine, EngineConfig, EngineStatus, ManualScheduler,
        Scheduler, SubscriptionId, TokioScheduler,
    };

    #[cfg(feature = "format")]
    pub use barline_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};
}
