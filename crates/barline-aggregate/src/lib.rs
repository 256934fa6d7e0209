//! Tick-to-bar building for barline.
//!
//! This crate provides the pure parts of bar synthesis:
//!
//! - [`bucket_start`] - Resolution-aligned time bucketing
//! - [`BarBuilder`] - Folds a tick into the previous bar of a subscription
//! - [`ContinuityValidator`] - Diagnostic spacing check over a bar sequence

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barline/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bucket;
mod builder;
mod continuity;

pub use bucket::{bucket_start, bucket_start_for_code, bucket_start_ms};
pub use builder::{BarBuilder, BarChange};
pub use continuity::{ContinuityValidator, ContinuityViolation};
