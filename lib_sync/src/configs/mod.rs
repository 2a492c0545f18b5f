//! # Configuration
//!
//! Engine configuration loaded from a JSON file with environment overrides.

pub mod config_engine;

pub use config_engine::{ConfigError, EngineConfig};
