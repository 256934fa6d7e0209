//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Check spacing between a subscription's consecutive bars on every
    /// bucket change. Failures are logged and counted only.
    pub validate_continuity: bool,
    /// Allowed deviation when checking continuity (milliseconds).
    pub continuity_tolerance_ms: i64,
    /// Scheduling frame used for batched store commits (milliseconds).
    pub frame_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_continuity: true,
            continuity_tolerance_ms: 1_000,
            frame_interval_ms: 16, // roughly one display frame at 60 Hz
        }
    }
}

impl EngineConfig {
    /// Environment variable toggling continuity checks.
    pub const VALIDATE_CONTINUITY_ENV: &'static str = "BARLINE_VALIDATE_CONTINUITY";
    /// Environment variable overriding the continuity tolerance.
    pub const CONTINUITY_TOLERANCE_ENV: &'static str = "BARLINE_CONTINUITY_TOLERANCE_MS";
    /// Environment variable overriding the frame interval.
    pub const FRAME_INTERVAL_ENV: &'static str = "BARLINE_FRAME_INTERVAL_MS";

    /// Builds a configuration from environment variables.
    ///
    /// Missing or malformed values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            validate_continuity: lookup(Self::VALIDATE_CONTINUITY_ENV)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.validate_continuity),
            continuity_tolerance_ms: lookup(Self::CONTINUITY_TOLERANCE_ENV)
                .and_then(|v| v.trim().parse().ok())
                .filter(|ms: &i64| *ms >= 0)
                .unwrap_or(defaults.continuity_tolerance_ms),
            frame_interval_ms: lookup(Self::FRAME_INTERVAL_ENV)
                .and_then(|v| v.trim().parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .unwrap_or(defaults.frame_interval_ms),
        }
    }

    /// Enables or disables continuity checks.
    #[must_use]
    pub const fn with_continuity_checks(mut self, enabled: bool) -> Self {
        self.validate_continuity = enabled;
        self
    }

    /// Sets the continuity tolerance.
    #[must_use]
    pub const fn with_continuity_tolerance_ms(mut self, tolerance_ms: i64) -> Self {
        self.continuity_tolerance_ms = tolerance_ms;
        self
    }

    /// Sets the frame interval.
    #[must_use]
    pub const fn with_frame_interval_ms(mut self, frame_interval_ms: u64) -> Self {
        self.frame_interval_ms = frame_interval_ms;
        self
    }

    /// Returns the frame interval as a [`Duration`].
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
