//! # Test Support for the Sync Engine
//!
//! Doubles for the engine's injected seams plus an in-process HTTP backend:
//! - [`MockSourceClient`]: scripted per-entity fetch outcomes
//! - [`RecordingDisplaySink`] / [`RecordingChartSink`]: capture every update
//! - [`MockBackend`]: a real axum server bound to an ephemeral port

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use lib_sync::models::{CounterSnapshot, StatGroupPayload, StatGroupSnapshot, SummaryStats};
use lib_sync::{ChartSink, DisplaySink, FetchError, SourceClient};

/// One scripted fetch outcome. `Ok` carries the counter value to report;
/// stat-group fetches synthesize a fixed snapshot from it.
pub type Outcome = Result<u64, ()>;

fn scripted_failure() -> FetchError {
    FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
}

/// A stat-group snapshot with recognizable contents for assertions.
pub fn sample_stat_group(marker: u64) -> StatGroupSnapshot {
    let payload = StatGroupPayload {
        daily_chart: json!({
            "data": [{"type": "bar", "y": [marker]}],
            "layout": {"title": "Daily"}
        })
        .to_string(),
        hourly_chart: json!({
            "data": [{"type": "scatter", "y": [marker, marker + 1]}],
            "layout": {"title": "Hourly"}
        })
        .to_string(),
        total_count: marker * 10,
        peak_count: marker + 5,
        average_count: marker / 2,
    };
    StatGroupSnapshot::decode(payload).expect("sample payload decodes")
}

/// `SourceClient` replaying a per-entity script of outcomes.
///
/// Each fetch consumes the next scripted outcome for that entity; once the
/// script is exhausted the last outcome repeats.
#[derive(Default)]
pub struct MockSourceClient {
    scripts: Mutex<HashMap<String, Vec<Outcome>>>,
    positions: Mutex<HashMap<String, usize>>,
    fetches: Mutex<Vec<String>>,
}

impl MockSourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the ordered outcomes for one entity id.
    pub fn script(&self, entity_id: &str, outcomes: Vec<Outcome>) {
        assert!(!outcomes.is_empty(), "script must have at least one outcome");
        self.scripts
            .lock()
            .expect("mock client lock poisoned")
            .insert(entity_id.to_string(), outcomes);
    }

    /// Ids fetched so far, in call order.
    pub fn fetch_log(&self) -> Vec<String> {
        self.fetches.lock().expect("mock client lock poisoned").clone()
    }

    pub fn fetch_count(&self, entity_id: &str) -> usize {
        self.fetch_log().iter().filter(|id| *id == entity_id).count()
    }

    fn next_outcome(&self, entity_id: &str) -> Outcome {
        self.fetches
            .lock()
            .expect("mock client lock poisoned")
            .push(entity_id.to_string());
        let scripts = self.scripts.lock().expect("mock client lock poisoned");
        let outcomes = scripts
            .get(entity_id)
            .unwrap_or_else(|| panic!("no script for entity '{entity_id}'"));
        let mut positions = self.positions.lock().expect("mock client lock poisoned");
        let position = positions.entry(entity_id.to_string()).or_insert(0);
        let outcome = outcomes[(*position).min(outcomes.len() - 1)];
        *position += 1;
        outcome
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    async fn fetch_counter(&self, camera_id: &str) -> Result<CounterSnapshot, FetchError> {
        match self.next_outcome(camera_id) {
            Ok(value) => Ok(CounterSnapshot {
                current_count: value,
                hour_total: value * 2,
                daily_total: value * 3,
            }),
            Err(()) => Err(scripted_failure()),
        }
    }

    async fn fetch_stat_group(&self, branch_id: &str) -> Result<StatGroupSnapshot, FetchError> {
        match self.next_outcome(branch_id) {
            Ok(value) => Ok(sample_stat_group(value)),
            Err(()) => Err(scripted_failure()),
        }
    }
}

/// Everything a `DisplaySink` can be told, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    CounterText { entity: String, text: String },
    HourTotal { entity: String, value: u64 },
    DailyTotal { entity: String, value: u64 },
    Summary { entity: String, total: u64, peak: u64 },
    ErrorIndicator { entity: String, visible: bool, message: String },
}

/// `DisplaySink` that records every call for later assertions.
#[derive(Default)]
pub struct RecordingDisplaySink {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplaySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().expect("display sink lock poisoned").clone()
    }

    /// Counter texts written for one entity, in order.
    pub fn counter_texts(&self, entity_id: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::CounterText { entity, text } if entity == entity_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// The most recent error-indicator state for one entity.
    pub fn indicator(&self, entity_id: &str) -> Option<(bool, String)> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                DisplayEvent::ErrorIndicator { entity, visible, message } if entity == entity_id => {
                    Some((visible, message))
                }
                _ => None,
            })
    }

    fn push(&self, event: DisplayEvent) {
        self.events.lock().expect("display sink lock poisoned").push(event);
    }
}

impl DisplaySink for RecordingDisplaySink {
    fn set_counter_text(&self, entity_id: &str, formatted: &str) {
        self.push(DisplayEvent::CounterText {
            entity: entity_id.to_string(),
            text: formatted.to_string(),
        });
    }

    fn set_hour_total(&self, entity_id: &str, value: u64) {
        self.push(DisplayEvent::HourTotal {
            entity: entity_id.to_string(),
            value,
        });
    }

    fn set_daily_total(&self, entity_id: &str, value: u64) {
        self.push(DisplayEvent::DailyTotal {
            entity: entity_id.to_string(),
            value,
        });
    }

    fn set_summary(&self, entity_id: &str, summary: &SummaryStats) {
        self.push(DisplayEvent::Summary {
            entity: entity_id.to_string(),
            total: summary.total,
            peak: summary.peak,
        });
    }

    fn set_error_visible(&self, entity_id: &str, visible: bool, message: &str) {
        self.push(DisplayEvent::ErrorIndicator {
            entity: entity_id.to_string(),
            visible,
            message: message.to_string(),
        });
    }
}

/// One recorded chart update.
#[derive(Debug, Clone)]
pub struct ChartEvent {
    pub chart_element_id: String,
    pub traces: usize,
    pub layout: Value,
}

/// `ChartSink` that records every plot update.
#[derive(Default)]
pub struct RecordingChartSink {
    events: Mutex<Vec<ChartEvent>>,
}

impl RecordingChartSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChartEvent> {
        self.events.lock().expect("chart sink lock poisoned").clone()
    }

    pub fn updates_for(&self, chart_element_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.chart_element_id == chart_element_id)
            .count()
    }
}

impl ChartSink for RecordingChartSink {
    fn render_or_update(&self, chart_element_id: &str, data: &[Value], layout: &Value) {
        self.events
            .lock()
            .expect("chart sink lock poisoned")
            .push(ChartEvent {
                chart_element_id: chart_element_id.to_string(),
                traces: data.len(),
                layout: layout.clone(),
            });
    }
}

#[derive(Clone, Default)]
struct BackendState {
    counters: Arc<Mutex<HashMap<String, Value>>>,
    stats: Arc<Mutex<HashMap<String, Value>>>,
}

/// An axum server speaking the dashboard backend protocol on 127.0.0.1.
///
/// Unknown ids answer 404; bodies are whatever was last installed, so tests
/// can serve malformed payloads as easily as valid ones.
pub struct MockBackend {
    state: BackendState,
    addr: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let state = BackendState::default();
        let app = Router::new()
            .route("/camera-stats/{camera}/", get(serve_counter))
            .route("/stats/{branch}/", get(serve_stats))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { state, addr, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn set_counter(&self, camera_id: &str, body: Value) {
        self.state
            .counters
            .lock()
            .expect("backend lock poisoned")
            .insert(camera_id.to_string(), body);
    }

    pub fn set_stats(&self, branch_id: &str, body: Value) {
        self.state
            .stats
            .lock()
            .expect("backend lock poisoned")
            .insert(branch_id.to_string(), body);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_counter(
    State(state): State<BackendState>,
    Path(camera): Path<String>,
) -> axum::response::Response {
    serve_from(&state.counters, &camera)
}

async fn serve_stats(
    State(state): State<BackendState>,
    Path(branch): Path<String>,
) -> axum::response::Response {
    serve_from(&state.stats, &branch)
}

fn serve_from(map: &Arc<Mutex<HashMap<String, Value>>>, id: &str) -> axum::response::Response {
    match map.lock().expect("backend lock poisoned").get(id) {
        Some(body) => axum::Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
