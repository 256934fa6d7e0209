//! Real-time bar engine for barline.
//!
//! This crate turns a stream of ticks into live OHLCV bars for every
//! subscribed symbol and resolution:
//!
//! - [`Engine`] - Subscribe, unsubscribe, publish ticks, inspect status
//! - [`SubscriptionRegistry`] - Concurrent map of active subscriptions
//! - [`Dispatcher`] - Fans a tick out to the subscriptions of its symbol
//! - [`BatchScheduler`] - Coalesces high-frequency updates per frame
//! - [`BarCollector`] - Callback sink keeping one bar per bucket

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barline/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod batch;
mod collector;
mod config;
mod dispatcher;
mod engine;
mod registry;
mod scheduler;

pub use batch::{BatchScheduler, CommitFn};
pub use collector::BarCollector;
pub use config::EngineConfig;
pub use dispatcher::{DispatchStats, DispatchStatsSnapshot, Dispatcher};
pub use engine::{Engine, EngineStatus};
pub use registry::{BarCallback, Subscription, SubscriptionId, SubscriptionRegistry};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
