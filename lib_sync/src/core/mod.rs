//! # Engine Core
//!
//! The state and control machinery of the sync engine:
//! - `registry`: per-entity sync state and registration order
//! - `retry`: bounded-retry decisions over registry state
//! - `scheduler`: the two self-rescheduling polling cycles
//! - `interpolate`: pure counter ramp math and animation generations
//! - `engine`: the coordinator wiring everything together

pub mod engine;
pub mod interpolate;
pub mod registry;
pub mod retry;
pub mod scheduler;

pub use engine::{SyncEngine, Visibility};
pub use registry::{EntityKind, EntityRegistry, RegistryError};
pub use retry::{RetryController, RetryDecision, RetryPolicy};
pub use scheduler::{PollCycle, PollScheduler};
