//! # Retrieval
//!
//! Clients that pull entity snapshots from the dashboard backend.

pub mod source_client;

pub use source_client::{FailureKind, FetchError, HttpSourceClient, SourceClient};
