//! # Engine Configuration
//!
//! A single flat JSON document describing the polled entity set and the
//! timing knobs, with environment-variable overrides for the numeric
//! values. Everything has a default, so an empty document is valid (if not
//! very useful, with no cameras or branches to poll).
//!
//! Recognized environment overrides:
//! `OCCUDASH_REFRESH_INTERVAL_MS`, `OCCUDASH_STATS_UPDATE_INTERVAL_MS`,
//! `OCCUDASH_MAX_RETRY_ATTEMPTS`, `OCCUDASH_RETRY_DELAY_MS`,
//! `OCCUDASH_ANIMATION_DURATION_MS`.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::interpolate::DEFAULT_ANIMATION_DURATION;
use crate::core::retry::{DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Counter cycle period.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5_000;
/// Stat-group cycle period.
pub const DEFAULT_STATS_UPDATE_INTERVAL_MS: u64 = 300_000;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("environment override {name} has invalid value '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The recognized configuration surface of the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Absolute base URL of the dashboard backend.
    pub base_url: String,
    /// Camera ids polled on the fast cycle, in display order.
    pub cameras: Vec<String>,
    /// Branch ids polled on the slow cycle, in display order.
    pub branches: Vec<String>,
    pub refresh_interval_ms: u64,
    pub stats_update_interval_ms: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub animation_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cameras: Vec::new(),
            branches: Vec::new(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            stats_update_interval_ms: DEFAULT_STATS_UPDATE_INTERVAL_MS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            animation_duration_ms: DEFAULT_ANIMATION_DURATION.as_millis() as u64,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration file, applies environment overrides and
    /// validates the result.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the `OCCUDASH_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse("OCCUDASH_REFRESH_INTERVAL_MS")? {
            self.refresh_interval_ms = v;
        }
        if let Some(v) = env_parse("OCCUDASH_STATS_UPDATE_INTERVAL_MS")? {
            self.stats_update_interval_ms = v;
        }
        if let Some(v) = env_parse("OCCUDASH_MAX_RETRY_ATTEMPTS")? {
            self.max_retry_attempts = v;
        }
        if let Some(v) = env_parse("OCCUDASH_RETRY_DELAY_MS")? {
            self.retry_delay_ms = v;
        }
        if let Some(v) = env_parse("OCCUDASH_ANIMATION_DURATION_MS")? {
            self.animation_duration_ms = v;
        }
        Ok(())
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_ms must be greater than zero".into(),
            ));
        }
        if self.stats_update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "stats_update_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn stats_update_interval(&self) -> Duration {
        Duration::from_millis(self.stats_update_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
