//! # Display and Chart Sinks
//!
//! The outbound surface of the engine. Both sinks are opaque consumers: the
//! engine pushes formatted values, summary numbers, error flags and plot
//! specifications, and never reads anything back.
//!
//! `render_or_update` is expected to be idempotent; repeated calls with the
//! same specification update the existing plot in place rather than
//! recreating it.
//!
//! The tracing-backed implementations make the engine observable when run
//! headless and serve as reference implementations of the traits.

use serde_json::Value;
use tracing::info;

use crate::models::SummaryStats;

/// Receiver of formatted per-entity values and error indicators.
pub trait DisplaySink: Send + Sync {
    /// Replaces the animated counter text for one camera.
    fn set_counter_text(&self, entity_id: &str, formatted: &str);
    /// Updates the rolling last-hour total for one camera.
    fn set_hour_total(&self, entity_id: &str, value: u64);
    /// Updates the since-midnight total for one camera.
    fn set_daily_total(&self, entity_id: &str, value: u64);
    /// Replaces the aggregate headline numbers for one branch.
    fn set_summary(&self, entity_id: &str, summary: &SummaryStats);
    /// Shows or hides the per-entity error indicator.
    ///
    /// `message` is only meaningful while `visible` is true.
    fn set_error_visible(&self, entity_id: &str, visible: bool, message: &str);
}

/// Receiver of declarative plot descriptions.
pub trait ChartSink: Send + Sync {
    /// Creates or in-place updates the plot for one chart element.
    fn render_or_update(&self, chart_element_id: &str, data: &[Value], layout: &Value);
}

/// Formats a count with thousands separators.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a counter value the way the dashboard shows it.
pub fn format_people(value: u64) -> String {
    format!("{} people", format_count(value))
}

/// `DisplaySink` that logs every update through `tracing`.
pub struct TracingDisplaySink;

impl DisplaySink for TracingDisplaySink {
    fn set_counter_text(&self, entity_id: &str, formatted: &str) {
        info!(entity = entity_id, value = formatted, "counter");
    }

    fn set_hour_total(&self, entity_id: &str, value: u64) {
        info!(entity = entity_id, value, "hour total");
    }

    fn set_daily_total(&self, entity_id: &str, value: u64) {
        info!(entity = entity_id, value, "daily total");
    }

    fn set_summary(&self, entity_id: &str, summary: &SummaryStats) {
        info!(
            entity = entity_id,
            total = summary.total,
            peak = summary.peak,
            average = summary.average,
            "summary"
        );
    }

    fn set_error_visible(&self, entity_id: &str, visible: bool, message: &str) {
        if visible {
            info!(entity = entity_id, message, "error indicator shown");
        } else {
            info!(entity = entity_id, "error indicator hidden");
        }
    }
}

/// `ChartSink` that logs plot updates instead of rendering them.
pub struct TracingChartSink;

impl ChartSink for TracingChartSink {
    fn render_or_update(&self, chart_element_id: &str, data: &[Value], _layout: &Value) {
        info!(chart = chart_element_id, traces = data.len(), "chart updated");
    }
}
