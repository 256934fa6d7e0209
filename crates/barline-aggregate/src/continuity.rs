//! Diagnostic checks on the spacing of consecutive bars.

use barline_types::{Bar, Resolution};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A pair of consecutive bars that are not exactly one interval apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityViolation {
    /// Index of the later bar in the checked slice.
    pub index: usize,
    /// Time the bar was expected to start at (ms).
    pub expected_ms: i64,
    /// Time the bar actually starts at (ms).
    pub actual_ms: i64,
}

impl ContinuityViolation {
    /// Signed distance between the actual and the expected start.
    #[must_use]
    pub const fn drift_ms(&self) -> i64 {
        self.actual_ms - self.expected_ms
    }
}

/// Checks that successive bar starts differ by exactly one interval.
///
/// Purely diagnostic: a failed check is logged and reported, never used to
/// hold back or rewrite bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityValidator {
    tolerance_ms: i64,
}

impl Default for ContinuityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuityValidator {
    /// Default allowed deviation from the expected start time.
    pub const DEFAULT_TOLERANCE_MS: i64 = 1_000;

    /// Creates a validator with the default tolerance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tolerance_ms: Self::DEFAULT_TOLERANCE_MS,
        }
    }

    /// Creates a validator with a custom tolerance.
    #[must_use]
    pub const fn with_tolerance_ms(tolerance_ms: i64) -> Self {
        Self { tolerance_ms }
    }

    /// Returns the allowed deviation in milliseconds.
    #[must_use]
    pub const fn tolerance_ms(&self) -> i64 {
        self.tolerance_ms
    }

    /// Returns the first violation in `bars`, if any.
    #[must_use]
    pub fn first_violation(&self, bars: &[Bar], resolution: Resolution) -> Option<ContinuityViolation> {
        self.violations(bars, resolution).next()
    }

    /// Returns every violation in `bars`.
    pub fn violations<'a>(
        &self,
        bars: &'a [Bar],
        resolution: Resolution,
    ) -> impl Iterator<Item = ContinuityViolation> + 'a {
        let interval_ms = resolution.interval_ms();
        let tolerance_ms = self.tolerance_ms;
        bars.windows(2).enumerate().filter_map(move |(i, pair)| {
            let expected_ms = pair[0].time_ms + interval_ms;
            let actual_ms = pair[1].time_ms;
            ((actual_ms - expected_ms).abs() > tolerance_ms).then_some(ContinuityViolation {
                index: i + 1,
                expected_ms,
                actual_ms,
            })
        })
    }

    /// Returns true if every consecutive pair is one interval apart.
    ///
    /// The first violation found is logged.
    pub fn validate(&self, bars: &[Bar], resolution: Resolution) -> bool {
        match self.first_violation(bars, resolution) {
            None => true,
            Some(violation) => {
                warn!(
                    resolution = %resolution,
                    index = violation.index,
                    expected_ms = violation.expected_ms,
                    actual_ms = violation.actual_ms,
                    drift_ms = violation.drift_ms(),
                    "bar continuity violated"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_at(times: &[i64]) -> Vec<Bar> {
        times.iter().map(|&t| Bar::flat(t, 1.0, 0.0)).collect()
    }

    #[test]
    fn test_contiguous_bars_pass() {
        let bars = bars_at(&[0, 60_000, 120_000, 180_000]);
        assert!(ContinuityValidator::new().validate(&bars, Resolution::Minute1));
    }

    #[test]
    fn test_short_inputs_pass() {
        let validator = ContinuityValidator::new();
        assert!(validator.validate(&[], Resolution::Minute1));
        assert!(validator.validate(&bars_at(&[60_000]), Resolution::Minute1));
    }

    #[test]
    fn test_gap_fails() {
        let bars = bars_at(&[0, 60_000, 180_000]);
        let validator = ContinuityValidator::new();
        assert!(!validator.validate(&bars, Resolution::Minute1));

        let violation = validator.first_violation(&bars, Resolution::Minute1).unwrap();
        assert_eq!(violation.index, 2);
        assert_eq!(violation.expected_ms, 120_000);
        assert_eq!(violation.drift_ms(), 60_000);
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let bars = bars_at(&[0, 61_000]);
        assert!(ContinuityValidator::new().validate(&bars, Resolution::Minute1));

        let bars = bars_at(&[0, 61_001]);
        assert!(!ContinuityValidator::new().validate(&bars, Resolution::Minute1));
        assert!(ContinuityValidator::with_tolerance_ms(5_000).validate(&bars, Resolution::Minute1));
    }

    #[test]
    fn test_uses_resolution_interval() {
        let bars = bars_at(&[0, 14_400_000, 28_800_000]);
        assert!(ContinuityValidator::new().validate(&bars, Resolution::Hour4));
        assert!(!ContinuityValidator::new().validate(&bars, Resolution::Hour1));
    }

    #[test]
    fn test_collects_all_violations() {
        let bars = bars_at(&[0, 120_000, 180_000, 600_000]);
        let found: Vec<_> = ContinuityValidator::new()
            .violations(&bars, Resolution::Minute1)
            .map(|v| v.index)
            .collect();
        assert_eq!(found, vec![1, 3]);
    }
}
