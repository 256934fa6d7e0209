//! OHLCV bar (candlestick) data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar covering one resolution-aligned bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bucket start time in milliseconds since the Unix epoch.
    pub time_ms: i64,
    /// Opening price (the previous bar's close once history exists).
    pub open: f64,
    /// Highest price during the bucket.
    pub high: f64,
    /// Lowest price during the bucket.
    pub low: f64,
    /// Latest price in the bucket.
    pub close: f64,
    /// Accumulated volume.
    pub volume: f64,
}

impl Bar {
    /// Creates a new bar.
    #[must_use]
    pub const fn new(time_ms: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Creates a bar where open, high, low and close are all `price`.
    #[must_use]
    pub const fn flat(time_ms: i64, price: f64, volume: f64) -> Self {
        Self::new(time_ms, price, price, price, price, volume)
    }

    /// Returns the bucket start as a UTC datetime, if representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time_ms)
    }

    /// Returns true if `low <= open <= high` and `low <= close <= high`.
    #[must_use]
    pub fn satisfies_bounds(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) bar.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
