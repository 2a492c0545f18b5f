//! # Entity Registry
//!
//! Tracks the fixed set of polled entities and their per-entity mutable
//! state. The set is established once at startup from the configured mount
//! points; nothing is added or removed during a session.
//!
//! Two kinds of entities exist: per-camera counters on the fast cycle and
//! per-branch stat groups on the slow cycle. Ids are unique within a kind,
//! and registration order is preserved because the poll cycles visit
//! entities in exactly that order.
//!
//! Registry misuse (`DuplicateEntity`, `UnknownEntity`) is a programming
//! error surfaced at bootstrap time; during normal polling every id handed
//! to the registry came out of it in the first place.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors produced by registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already registered for this kind.
    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),
    /// The id was never registered for this kind.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),
}

/// The two kinds of polled subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A single numeric per-camera occupancy value, polled on the fast cycle.
    Counter,
    /// A per-branch aggregate/chart payload, polled on the slow cycle.
    StatGroup,
}

/// Mutable per-entity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityState {
    /// Last successfully fetched value. Only meaningful for counters.
    pub last_value: u64,
    /// Consecutive failures in the current retry streak. Returns to zero
    /// when the streak ends, on success or on exhaustion.
    pub retry_count: u32,
    /// True once a retry budget was exhausted since the last success.
    pub errored: bool,
}

/// What one recorded failure did to the entity's retry streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Budget remains: the streak advanced to this attempt number.
    Retry { attempt: u32 },
    /// The budget is spent: the entity is errored and the streak is closed.
    Exhausted,
}

/// What a successful fetch replaced, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessRecord {
    /// The counter value before this success (0 for stat groups).
    pub previous_value: u64,
    /// Whether the entity had been marked errored before this success.
    pub was_errored: bool,
}

#[derive(Default)]
struct RegistryInner {
    counters: HashMap<String, EntityState>,
    counter_order: Vec<String>,
    stat_groups: HashMap<String, EntityState>,
    stat_group_order: Vec<String>,
}

impl RegistryInner {
    fn slot(&mut self, kind: EntityKind) -> (&mut HashMap<String, EntityState>, &mut Vec<String>) {
        match kind {
            EntityKind::Counter => (&mut self.counters, &mut self.counter_order),
            EntityKind::StatGroup => (&mut self.stat_groups, &mut self.stat_group_order),
        }
    }

    fn state_mut(&mut self, kind: EntityKind, id: &str) -> Result<&mut EntityState, RegistryError> {
        let (map, _) = self.slot(kind);
        map.get_mut(id)
            .ok_or_else(|| RegistryError::UnknownEntity(id.to_string()))
    }
}

/// Thread-safe registry of all polled entities.
pub struct EntityRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Registers an entity with default state.
    pub fn register(&self, kind: EntityKind, id: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        let (map, order) = inner.slot(kind);
        if map.contains_key(id) {
            return Err(RegistryError::DuplicateEntity(id.to_string()));
        }
        map.insert(id.to_string(), EntityState::default());
        order.push(id.to_string());
        Ok(())
    }

    /// Returns a snapshot of an entity's current state.
    pub fn get(&self, kind: EntityKind, id: &str) -> Result<EntityState, RegistryError> {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        inner.state_mut(kind, id).map(|state| *state)
    }

    /// Records a successful fetch: the retry count resets to zero, the
    /// errored flag clears, and counters take the new value.
    pub fn record_success(
        &self,
        kind: EntityKind,
        id: &str,
        value: Option<u64>,
    ) -> Result<SuccessRecord, RegistryError> {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        let state = inner.state_mut(kind, id)?;
        let record = SuccessRecord {
            previous_value: state.last_value,
            was_errored: state.errored,
        };
        state.retry_count = 0;
        state.errored = false;
        if let Some(value) = value {
            state.last_value = value;
        }
        Ok(record)
    }

    /// Records a failed fetch against a bounded attempt budget.
    ///
    /// Read, decide and write happen under one lock acquisition, so
    /// overlapping failures for the same entity (a retry fetch racing the
    /// next regular pass) can never push the count past the budget.
    ///
    /// While budget remains the streak advances. Once `retry_count` reaches
    /// `max_attempts` the entity becomes errored and the count returns to
    /// zero, closing the streak; the next failure opens a fresh streak at
    /// attempt 1 while `errored` stays set until a success.
    pub fn record_failure(
        &self,
        kind: EntityKind,
        id: &str,
        max_attempts: u32,
    ) -> Result<FailureOutcome, RegistryError> {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        let state = inner.state_mut(kind, id)?;
        if state.retry_count >= max_attempts {
            state.errored = true;
            state.retry_count = 0;
            return Ok(FailureOutcome::Exhausted);
        }
        state.retry_count += 1;
        Ok(FailureOutcome::Retry {
            attempt: state.retry_count,
        })
    }

    /// All counter ids, in registration order.
    pub fn counter_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("Registry lock poisoned");
        inner.counter_order.clone()
    }

    /// All stat-group ids, in registration order.
    pub fn stat_group_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("Registry lock poisoned");
        inner.stat_group_order.clone()
    }
}
