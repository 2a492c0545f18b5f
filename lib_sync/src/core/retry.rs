//! # Retry/Backoff Controller
//!
//! Decides, per entity, what a failed fetch leads to: a single delayed
//! retry, or the transition into the persistent errored state once the
//! bounded attempt budget is spent.
//!
//! The controller is a pure decision layer over registry state. It owns no
//! timers; the engine turns a [`RetryDecision::Retry`] into a one-shot
//! delayed task. Keeping time out of this module makes the full state walk
//! (`Healthy -> Retrying(1..=n) -> Errored`) checkable without a runtime.
//!
//! Retries are scoped to the single failing entity, so one unreachable
//! source never delays or stalls polling of healthy entities in the same
//! cycle. An errored entity is not excluded from regular passes: the next
//! cycle fetch is its path back to `Healthy`, and a failure there re-enters
//! `Retrying(1)` and walks the full budget again before another `Errored`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::registry::{EntityKind, EntityRegistry, FailureOutcome, RegistryError};

/// Default maximum number of consecutive retries per entity.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
/// Default delay before a scheduled retry fetch.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// The bounded retry budget and delay shared by all entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before an entity is marked errored.
    pub max_attempts: u32,
    /// Delay before each scheduled retry fetch.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The outcome of one recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule a single retry fetch after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// Budget exhausted: the entity is now errored and nothing is scheduled.
    GiveUp,
}

/// Applies the retry policy to registry state on each failure.
pub struct RetryController {
    registry: Arc<EntityRegistry>,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(registry: Arc<EntityRegistry>, policy: RetryPolicy) -> Self {
        Self { registry, policy }
    }

    /// Records one failed fetch and decides what happens next.
    ///
    /// Recording and deciding are a single registry operation under one
    /// lock, so concurrent failures for the same entity (a retry fetch
    /// racing the next regular pass) keep the count inside
    /// `[0, max_attempts]` and produce at most one `GiveUp` per streak.
    pub fn on_failure(&self, kind: EntityKind, id: &str) -> Result<RetryDecision, RegistryError> {
        match self
            .registry
            .record_failure(kind, id, self.policy.max_attempts)?
        {
            FailureOutcome::Retry { attempt } => Ok(RetryDecision::Retry {
                attempt,
                delay: self.policy.delay,
            }),
            FailureOutcome::Exhausted => Ok(RetryDecision::GiveUp),
        }
    }
}
