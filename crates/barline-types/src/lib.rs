//! Core types for the barline real-time bar engine.
//!
//! This crate provides the fundamental data structures used throughout barline:
//!
//! - [`Tick`] - A single price update with optional book, range and volume fields
//! - [`Quote`] - The latest price fields of a symbol
//! - [`Bar`] - One OHLCV bucket
//! - [`Resolution`] - Bar width, backed by [`RESOLUTION_TABLE`]
//! - [`Symbol`] - Normalized symbol name

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barline/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod error;
mod resolution;
mod symbol;
mod tick;

pub use bar::Bar;
pub use error::{BarlineError, Result};
pub use resolution::{
    RESOLUTION_TABLE, Resolution, ResolutionEntry, ResolutionParseError, interval_seconds,
};
pub use symbol::{Symbol, SymbolError};
pub use tick::{Quote, Tick};
