//! Folding ticks into per-subscription bars.

use barline_types::{Bar, Resolution, Tick};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bucket_start;

/// How a tick affected the bar it was folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarChange {
    /// First bar of a subscription with no history.
    Opened,
    /// The tick started a new bucket; the bar opens at the previous close.
    Rolled,
    /// The tick landed in the current bucket.
    Updated,
    /// The tick belongs to an earlier bucket and was ignored.
    Late,
}

impl BarChange {
    /// Returns true if a bar in a new bucket was produced.
    #[must_use]
    pub const fn is_new_bar(&self) -> bool {
        matches!(self, Self::Opened | Self::Rolled)
    }
}

/// Stateless bar builder.
///
/// The caller owns the previous bar; the builder only computes the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarBuilder;

impl BarBuilder {
    /// Folds `tick` into `previous` and returns the resulting bar.
    #[must_use]
    pub fn update(tick: &Tick, previous: Option<&Bar>, resolution: Resolution) -> Bar {
        Self::apply(tick, previous, resolution).0
    }

    /// Folds `tick` into `previous`, also reporting what kind of change happened.
    ///
    /// - No previous bar: a flat bar at the tick price.
    /// - Later bucket: a new bar whose open is the previous close.
    /// - Same bucket: high/low/close/volume are updated, open is kept.
    /// - Earlier bucket: `previous` is returned unchanged.
    #[must_use]
    pub fn apply(tick: &Tick, previous: Option<&Bar>, resolution: Resolution) -> (Bar, BarChange) {
        let current_bucket = bucket_start(tick.timestamp_ms, resolution);

        let Some(previous) = previous else {
            let bar = Bar::flat(current_bucket * 1000, tick.price, tick.volume_or_zero());
            return (bar, BarChange::Opened);
        };

        let previous_bucket = bucket_start(previous.time_ms, resolution);

        match current_bucket.cmp(&previous_bucket) {
            std::cmp::Ordering::Greater => {
                let open = previous.close;
                let close = tick.price;
                let bar = Bar::new(
                    current_bucket * 1000,
                    open,
                    open.max(close),
                    open.min(close),
                    close,
                    tick.volume_or_zero(),
                );
                (bar, BarChange::Rolled)
            }
            std::cmp::Ordering::Equal => {
                // price is included so close never escapes a tick-reported range
                let high = previous.high.max(tick.high_or_price()).max(tick.price);
                let low = previous.low.min(tick.low_or_price()).min(tick.price);
                let bar = Bar::new(
                    current_bucket * 1000,
                    previous.open,
                    high,
                    low,
                    tick.price,
                    previous.volume + tick.volume_or_zero(),
                );
                (bar, BarChange::Updated)
            }
            std::cmp::Ordering::Less => {
                warn!(
                    symbol = %tick.symbol,
                    resolution = %resolution,
                    tick_ms = tick.timestamp_ms,
                    bar_ms = previous.time_ms,
                    "late tick ignored"
                );
                (*previous, BarChange::Late)
            }
        }
    }
}
