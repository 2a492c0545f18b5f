//! # lib_sync
//!
//! The polling, reconciliation and failure-recovery engine behind the
//! occupancy dashboard. The engine keeps per-entity state in sync with a
//! remote backend over two periodic cycles, absorbs transient fetch
//! failures with bounded retries, and pushes formatted updates to injected
//! display and chart sinks.

#![forbid(unsafe_code)]

pub mod configs;
pub mod core;
pub mod loggers;
pub mod models;
pub mod retrieve;
pub mod sinks;

pub use crate::configs::{ConfigError, EngineConfig};
pub use crate::core::{
    EntityKind, EntityRegistry, PollScheduler, RegistryError, RetryController, RetryDecision,
    RetryPolicy, SyncEngine, Visibility,
};
pub use crate::models::{CounterSnapshot, StatGroupSnapshot, SummaryStats};
pub use crate::retrieve::{FailureKind, FetchError, HttpSourceClient, SourceClient};
pub use crate::sinks::{ChartSink, DisplaySink, TracingChartSink, TracingDisplaySink};
