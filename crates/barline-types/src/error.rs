//! Error types for barline.

use thiserror::Error;

use crate::SymbolError;

/// Result type alias for barline operations.
pub type Result<T> = std::result::Result<T, BarlineError>;

/// Errors that can occur while ingesting ticks or reading tick data.
#[derive(Error, Debug)]
pub enum BarlineError {
    /// Resolution code not present in the resolution table.
    #[error("Unknown resolution: {0}")]
    UnknownResolution(String),

    /// Symbol name could not be parsed.
    #[error(transparent)]
    InvalidSymbol(#[from] SymbolError),

    /// Tick cannot be folded into a bar.
    #[error("Invalid tick for '{symbol}': {reason}")]
    InvalidTick {
        /// Symbol carried by the tick.
        symbol: String,
        /// Why the tick was rejected.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
