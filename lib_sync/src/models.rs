//! # Wire Payloads and Decoded Snapshots
//!
//! Serde models for the two backend endpoints consumed by the engine, plus
//! the fully decoded forms handed to the sinks.
//!
//! The stat-group endpoint embeds its two chart specifications as
//! JSON-encoded *strings* inside the outer JSON document. Decoding therefore
//! happens in two steps: the outer [`StatGroupPayload`] first, then both
//! embedded [`PlotSpec`]s. [`StatGroupSnapshot::decode`] performs the second
//! step for the whole payload at once, so a malformed chart string fails the
//! entire fetch and nothing half-decoded ever reaches a chart sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded response from `GET /camera-stats/{cameraId}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CounterSnapshot {
    /// People currently counted by this camera.
    pub current_count: u64,
    /// Total entries over the last hour.
    pub hour_total: u64,
    /// Total entries since midnight.
    pub daily_total: u64,
}

/// The raw response body of `GET /stats/{branchId}/`, before the embedded
/// chart strings are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct StatGroupPayload {
    /// JSON-encoded plot specification for the daily chart.
    pub daily_chart: String,
    /// JSON-encoded plot specification for the hourly chart.
    pub hourly_chart: String,
    pub total_count: u64,
    pub peak_count: u64,
    pub average_count: u64,
}

/// A declarative plot description: an array of traces plus a layout object.
///
/// The engine treats both halves as opaque; only the chart sink interprets
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    /// Trace objects, in draw order.
    pub data: Vec<Value>,
    /// Layout options for the whole plot.
    pub layout: Value,
}

/// Aggregate headline numbers for one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    pub total: u64,
    pub peak: u64,
    pub average: u64,
}

/// One fully decoded response from `GET /stats/{branchId}/`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatGroupSnapshot {
    pub daily_chart: PlotSpec,
    pub hourly_chart: PlotSpec,
    pub summary: SummaryStats,
}

impl StatGroupSnapshot {
    /// Decodes both embedded chart strings of a raw payload.
    ///
    /// Both charts are decoded before either is returned, so the caller can
    /// never observe one updated chart alongside one stale chart.
    pub fn decode(payload: StatGroupPayload) -> Result<Self, serde_json::Error> {
        let daily_chart: PlotSpec = serde_json::from_str(&payload.daily_chart)?;
        let hourly_chart: PlotSpec = serde_json::from_str(&payload.hourly_chart)?;
        Ok(Self {
            daily_chart,
            hourly_chart,
            summary: SummaryStats {
                total: payload.total_count,
                peak: payload.peak_count,
                average: payload.average_count,
            },
        })
    }
}
