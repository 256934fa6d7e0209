//! Tick data representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BarlineError, Result};

/// A single price update for a symbol.
///
/// Only `price` and `timestamp_ms` are mandatory. The optional fields are
/// whatever the upstream transport happened to provide; bar building falls
/// back to `price` wherever one of them is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol the tick belongs to (may be empty when the caller routes explicitly).
    #[serde(default)]
    pub symbol: String,
    /// Last traded (close-equivalent) price.
    pub price: f64,
    /// Best bid price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    /// Best ask (offer) price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    /// Highest price observed since the previous tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    /// Lowest price observed since the previous tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Traded volume carried by this tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Event time in milliseconds since the Unix epoch.
    #[serde(alias = "timestampMs", alias = "timestamp")]
    pub timestamp_ms: i64,
}

impl Tick {
    /// Creates a tick carrying only a price.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp_ms: i64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            bid: None,
            ask: None,
            high: None,
            low: None,
            volume: None,
            timestamp_ms,
        }
    }

    /// Sets the top-of-book prices.
    #[must_use]
    pub const fn with_bid_ask(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Sets the intra-tick price range.
    #[must_use]
    pub const fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    /// Sets the traded volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Returns the tick volume, treating an absent volume as zero.
    #[must_use]
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }

    /// Returns the reported high, or the price when none was reported.
    #[must_use]
    pub fn high_or_price(&self) -> f64 {
        self.high.unwrap_or(self.price)
    }

    /// Returns the reported low, or the price when none was reported.
    #[must_use]
    pub fn low_or_price(&self) -> f64 {
        self.low.unwrap_or(self.price)
    }

    /// Returns the mid price when both sides of the book are known.
    #[must_use]
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Returns the spread (ask - bid) when both sides of the book are known.
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Returns the tick time as a UTC datetime, if representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }

    /// Returns the latest price fields of this tick.
    #[must_use]
    pub const fn quote(&self) -> Quote {
        Quote {
            price: self.price,
            bid: self.bid,
            ask: self.ask,
            timestamp_ms: self.timestamp_ms,
        }
    }

    /// Checks that the tick can be folded into a bar without breaking the
    /// OHLC bounds.
    ///
    /// # Errors
    ///
    /// Returns [`BarlineError::InvalidTick`] if the price is not a finite
    /// positive number, if any optional price is non-finite, or if the
    /// volume is negative.
    pub fn validate(&self) -> Result<()> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(self.invalid(format!("price {} is not a finite positive number", self.price)));
        }

        let optional_prices = [
            ("bid", self.bid),
            ("ask", self.ask),
            ("high", self.high),
            ("low", self.low),
        ];
        for (field, value) in optional_prices {
            if let Some(value) = value
                && !value.is_finite()
            {
                return Err(self.invalid(format!("{field} {value} is not finite")));
            }
        }

        if let Some(volume) = self.volume
            && !(volume.is_finite() && volume >= 0.0)
        {
            return Err(self.invalid(format!("volume {volume} is negative or not finite")));
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> BarlineError {
        BarlineError::InvalidTick {
            symbol: self.symbol.clone(),
            reason,
        }
    }
}

/// The latest price fields of a symbol, as pushed to a read-side store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price.
    pub price: f64,
    /// Best bid price, if known.
    pub bid: Option<f64>,
    /// Best ask price, if known.
    pub ask: Option<f64>,
    /// Time of the tick that produced this quote (ms since epoch).
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_fall_back_to_price() {
        let tick = Tick::new("EURUSD", 0, 1.1000);
        assert!((tick.high_or_price() - 1.1000).abs() < 1e-10);
        assert!((tick.low_or_price() - 1.1000).abs() < 1e-10);
        assert!(tick.volume_or_zero().abs() < 1e-10);
        assert_eq!(tick.mid(), None);
    }

    #[test]
    fn test_tick_mid_and_spread() {
        let tick = Tick::new("EURUSD", 0, 1.1000).with_bid_ask(1.1000, 1.1002);
        assert!((tick.mid().unwrap() - 1.1001).abs() < 1e-10);
        assert!((tick.spread().unwrap() - 0.0002).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_bad_prices() {
        assert!(Tick::new("EURUSD", 0, 1.1).validate().is_ok());
        assert!(Tick::new("EURUSD", 0, f64::NAN).validate().is_err());
        assert!(Tick::new("EURUSD", 0, 0.0).validate().is_err());
        assert!(
            Tick::new("EURUSD", 0, 1.1)
                .with_range(f64::INFINITY, 1.0)
                .validate()
                .is_err()
        );
        assert!(
            Tick::new("EURUSD", 0, 1.1)
                .with_volume(-1.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let tick: Tick = serde_json::from_str(r#"{"price": 1.25, "timestampMs": 61000}"#).unwrap();
        assert_eq!(tick.timestamp_ms, 61_000);
        assert!(tick.symbol.is_empty());
        assert_eq!(tick.volume, None);
    }

    #[test]
    fn test_quote_copies_price_fields() {
        let tick = Tick::new("GBPUSD", 5_000, 1.27)
            .with_bid_ask(1.2699, 1.2701)
            .with_volume(3.0);
        let quote = tick.quote();
        assert_eq!(quote.timestamp_ms, 5_000);
        assert_eq!(quote.bid, Some(1.2699));
        assert!((quote.price - 1.27).abs() < 1e-10);
    }
}
