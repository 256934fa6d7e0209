//! Bar resolution definitions and the static resolution table.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A resolution code together with its bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionEntry {
    /// Chart resolution code (e.g. `"5"`, `"1D"`).
    pub code: &'static str,
    /// Bucket width in whole seconds.
    pub interval_seconds: u64,
}

/// Every supported resolution, ordered from finest to coarsest.
pub const RESOLUTION_TABLE: [ResolutionEntry; 9] = [
    ResolutionEntry { code: "1", interval_seconds: 60 },
    ResolutionEntry { code: "5", interval_seconds: 300 },
    ResolutionEntry { code: "15", interval_seconds: 900 },
    ResolutionEntry { code: "30", interval_seconds: 1_800 },
    ResolutionEntry { code: "60", interval_seconds: 3_600 },
    ResolutionEntry { code: "240", interval_seconds: 14_400 },
    ResolutionEntry { code: "1D", interval_seconds: 86_400 },
    ResolutionEntry { code: "1W", interval_seconds: 604_800 },
    ResolutionEntry { code: "1M", interval_seconds: 2_592_000 },
];

/// Bar resolution.
///
/// Months are a fixed 30 days and weeks are aligned to the Unix epoch, so
/// every bucket start is an exact multiple of the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    /// 1-minute bars.
    #[default]
    #[serde(rename = "1")]
    Minute1,
    /// 5-minute bars.
    #[serde(rename = "5")]
    Minute5,
    /// 15-minute bars.
    #[serde(rename = "15")]
    Minute15,
    /// 30-minute bars.
    #[serde(rename = "30")]
    Minute30,
    /// 1-hour bars.
    #[serde(rename = "60")]
    Hour1,
    /// 4-hour bars.
    #[serde(rename = "240")]
    Hour4,
    /// Daily bars.
    #[serde(rename = "1D")]
    Day1,
    /// Weekly bars.
    #[serde(rename = "1W")]
    Week1,
    /// 30-day bars.
    #[serde(rename = "1M")]
    Month1,
}

impl Resolution {
    /// Returns this resolution's entry in [`RESOLUTION_TABLE`].
    #[must_use]
    pub const fn entry(&self) -> ResolutionEntry {
        RESOLUTION_TABLE[*self as usize]
    }

    /// Returns the resolution code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.entry().code
    }

    /// Returns the bucket width in seconds.
    #[must_use]
    pub const fn interval_seconds(&self) -> u64 {
        self.entry().interval_seconds
    }

    /// Returns the bucket width in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> i64 {
        self.interval_seconds() as i64 * 1000
    }

    /// Looks up a resolution code, returning `None` if it is not known.
    ///
    /// Besides the canonical codes, `D`/`1d`, `W`/`1w` and `M` are accepted.
    #[must_use]
    pub fn lookup(code: &str) -> Option<Self> {
        let code = code.trim();
        if let Some(index) = RESOLUTION_TABLE.iter().position(|entry| entry.code == code) {
            return Some(Self::all()[index]);
        }
        match code {
            "D" | "1d" => Some(Self::Day1),
            "W" | "1w" => Some(Self::Week1),
            "M" => Some(Self::Month1),
            _ => None,
        }
    }

    /// Looks up a resolution code, falling back to one minute for unknown codes.
    #[must_use]
    pub fn parse_or_default(code: &str) -> Self {
        Self::lookup(code).unwrap_or_default()
    }

    /// Returns all resolutions, in table order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
            Self::Week1,
            Self::Month1,
        ]
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Minute1 => "1 minute",
            Self::Minute5 => "5 minutes",
            Self::Minute15 => "15 minutes",
            Self::Minute30 => "30 minutes",
            Self::Hour1 => "1 hour",
            Self::Hour4 => "4 hours",
            Self::Day1 => "1 day",
            Self::Week1 => "1 week",
            Self::Month1 => "1 month (30 days)",
        }
    }
}

/// Returns the interval for a resolution code, using the one-minute interval
/// for unknown codes.
#[must_use]
pub fn interval_seconds(code: &str) -> u64 {
    Resolution::parse_or_default(code).interval_seconds()
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| ResolutionParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown resolution code strictly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionParseError(String);

impl std::fmt::Display for ResolutionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid resolution '{}', expected one of: 1, 5, 15, 30, 60, 240, 1D, 1W, 1M",
            self.0
        )
    }
}

impl std::error::Error for ResolutionParseError {}
