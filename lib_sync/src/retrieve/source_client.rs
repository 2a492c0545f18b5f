//! # Source Client
//!
//! Wraps a single fetch-and-decode call against one backend endpoint for
//! one entity. The client performs no retries of its own; retry policy is
//! owned entirely by the engine's retry controller, so a transport-level
//! retry layer would double-count attempts against the budget.
//!
//! [`SourceClient`] is the seam the engine is tested through; the
//! production implementation is [`HttpSourceClient`], a thin reqwest
//! wrapper with a request timeout and a joined base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::models::{CounterSnapshot, StatGroupPayload, StatGroupSnapshot};

/// Request timeout applied to every fetch, bounding worst-case pass latency.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("occudash/", env!("CARGO_PKG_VERSION"));

/// Why a single fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed before a response was obtained.
    #[error("transport failure: {0}")]
    Network(#[from] reqwest::Error),
    /// The server answered outside the 2xx range.
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    /// The response body did not match the expected shape.
    #[error("payload decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// The request URL could not be built from the base URL and entity id.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The two failure classes the retry machinery distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport-level failure or non-2xx status.
    Network,
    /// Payload did not decode to the expected shape.
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) | FetchError::Status(_) | FetchError::Url(_) => {
                FailureKind::Network
            }
            FetchError::Decode(_) => FailureKind::Decode,
        }
    }
}

/// One fetch-and-decode call per entity against an opaque backend.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches the current occupancy snapshot for one camera.
    async fn fetch_counter(&self, camera_id: &str) -> Result<CounterSnapshot, FetchError>;

    /// Fetches the aggregate statistics snapshot for one branch, with both
    /// embedded chart specifications already decoded.
    async fn fetch_stat_group(&self, branch_id: &str) -> Result<StatGroupSnapshot, FetchError>;
}

/// Production `SourceClient` speaking HTTP/JSON to the dashboard backend.
pub struct HttpSourceClient {
    inner: reqwest::Client,
    base_url: Url,
}

impl HttpSourceClient {
    /// Creates a client against an absolute base URL.
    ///
    /// The underlying reqwest client is reused across all polls to keep
    /// connection pooling effective.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        let inner = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner, base_url })
    }

    /// Performs one GET against a relative path and decodes the JSON body.
    ///
    /// Non-2xx answers become [`FetchError::Status`] without touching the
    /// body; decode problems surface separately from transport problems so
    /// the retry machinery can classify them.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.base_url.join(path)?;
        let response = self.inner.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_counter(&self, camera_id: &str) -> Result<CounterSnapshot, FetchError> {
        self.get_json(&format!("camera-stats/{camera_id}/")).await
    }

    async fn fetch_stat_group(&self, branch_id: &str) -> Result<StatGroupSnapshot, FetchError> {
        let payload: StatGroupPayload = self.get_json(&format!("stats/{branch_id}/")).await?;
        Ok(StatGroupSnapshot::decode(payload)?)
    }
}
