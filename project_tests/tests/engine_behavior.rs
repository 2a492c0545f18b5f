//! # Engine Behavior Tests
//!
//! Drives a full `SyncEngine` against scripted doubles under tokio's paused
//! clock, so retry delays and polling intervals elapse instantly and
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use lib_sync::{EngineConfig, EntityKind, SyncEngine};
use project_tests::{DisplayEvent, MockSourceClient, RecordingChartSink, RecordingDisplaySink};

const COUNTER_ERROR: &str = "Camera feed unavailable";
const STATS_ERROR: &str = "Failed to update statistics";

struct Harness {
    engine: SyncEngine,
    client: Arc<MockSourceClient>,
    display: Arc<RecordingDisplaySink>,
    charts: Arc<RecordingChartSink>,
}

fn test_config(cameras: &[&str], branches: &[&str]) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cameras = cameras.iter().map(|id| id.to_string()).collect();
    config.branches = branches.iter().map(|id| id.to_string()).collect();
    // Wide intervals keep scheduled passes out of the way of retry timing.
    config.refresh_interval_ms = 60_000;
    config.stats_update_interval_ms = 600_000;
    config
}

fn harness(config: &EngineConfig) -> Harness {
    let client = Arc::new(MockSourceClient::new());
    let display = Arc::new(RecordingDisplaySink::new());
    let charts = Arc::new(RecordingChartSink::new());
    let engine = SyncEngine::bootstrap(
        config,
        Arc::clone(&client) as _,
        Arc::clone(&display) as _,
        Arc::clone(&charts) as _,
    )
    .expect("bootstrap");
    Harness {
        engine,
        client,
        display,
        charts,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn parse_people(text: &str) -> u64 {
    text.strip_suffix(" people")
        .expect("people suffix")
        .replace(',', "")
        .parse()
        .expect("numeric counter text")
}

#[tokio::test(start_paused = true)]
async fn counter_pass_visits_cameras_in_registration_order() {
    let config = test_config(&["cam-a", "cam-b", "cam-c"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-a", vec![Ok(1)]);
    h.client.script("cam-b", vec![Ok(2)]);
    h.client.script("cam-c", vec![Ok(3)]);

    h.engine.start();
    settle().await;

    assert_eq!(h.client.fetch_log(), vec!["cam-a", "cam-b", "cam-c"]);
}

#[tokio::test(start_paused = true)]
async fn one_failing_camera_does_not_block_the_rest_of_the_pass() {
    let config = test_config(&["cam-bad", "cam-good"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-bad", vec![Err(())]);
    h.client.script("cam-good", vec![Ok(9)]);

    h.engine.start();
    settle().await;

    assert_eq!(h.client.fetch_count("cam-good"), 1);
    let state = h
        .engine
        .registry()
        .get(EntityKind::Counter, "cam-good")
        .unwrap();
    assert_eq!(state.last_value, 9);
    assert_eq!(state.retry_count, 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_through_a_delayed_retry() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Err(()), Ok(42)]);

    h.engine.start();
    settle().await;
    assert_eq!(h.client.fetch_count("cam-1"), 1);
    assert_eq!(
        h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap().retry_count,
        1
    );

    // The retry fires after the configured delay, not before.
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 1);
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 2);

    let state = h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap();
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.last_value, 42);
    assert!(!state.errored);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_exhaustion_marks_errored_and_shows_the_indicator() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Err(())]);

    h.engine.start();
    // Initial failure plus three spent retries, two seconds apart.
    tokio::time::sleep(Duration::from_millis(7_000)).await;

    assert_eq!(h.client.fetch_count("cam-1"), 4);
    let state = h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap();
    assert!(state.errored);
    // Exhaustion closes the failure streak.
    assert_eq!(state.retry_count, 0);
    assert_eq!(
        h.display.indicator("cam-1"),
        Some((true, COUNTER_ERROR.to_string()))
    );

    // No further retries are pending once the budget is spent.
    tokio::time::sleep(Duration::from_millis(20_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 4);
}

#[tokio::test(start_paused = true)]
async fn errored_camera_that_keeps_failing_reexhausts_instead_of_retrying_forever() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Err(())]);

    h.engine.start();
    tokio::time::sleep(Duration::from_millis(7_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 4);
    assert!(h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap().errored);

    // Quiet until the next scheduled pass; no retry every RETRY_DELAY.
    tokio::time::sleep(Duration::from_millis(52_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 4);

    // The second sustained streak spends the whole budget again and then
    // settles back into errored with nothing pending.
    tokio::time::sleep(Duration::from_millis(8_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 8);
    let state = h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap();
    assert!(state.errored);
    assert_eq!(state.retry_count, 0);
    assert_eq!(
        h.display.indicator("cam-1"),
        Some((true, COUNTER_ERROR.to_string()))
    );

    tokio::time::sleep(Duration::from_millis(50_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 8);
}

#[tokio::test(start_paused = true)]
async fn errored_camera_recovers_on_the_next_scheduled_pass() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client
        .script("cam-1", vec![Err(()), Err(()), Err(()), Err(()), Ok(7)]);

    h.engine.start();
    tokio::time::sleep(Duration::from_millis(7_000)).await;
    assert!(h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap().errored);

    // The regular cycle keeps polling errored entities.
    tokio::time::sleep(Duration::from_millis(60_000)).await;

    let state = h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap();
    assert!(!state.errored);
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.last_value, 7);
    assert_eq!(h.display.indicator("cam-1"), Some((false, String::new())));
}

#[tokio::test(start_paused = true)]
async fn stat_group_failure_uses_its_own_indicator_message() {
    let config = test_config(&[], &["downtown"]);
    let mut h = harness(&config);
    h.client.script("downtown", vec![Err(())]);

    h.engine.start();
    tokio::time::sleep(Duration::from_millis(7_000)).await;

    assert_eq!(
        h.display.indicator("downtown"),
        Some((true, STATS_ERROR.to_string()))
    );
    assert!(h
        .engine
        .registry()
        .get(EntityKind::StatGroup, "downtown")
        .unwrap()
        .errored);
}

#[tokio::test(start_paused = true)]
async fn stat_group_success_updates_both_charts_and_the_summary() {
    let config = test_config(&[], &["downtown"]);
    let mut h = harness(&config);
    h.client.script("downtown", vec![Ok(4)]);

    h.engine.start();
    settle().await;

    assert_eq!(h.charts.updates_for("daily-chart-downtown"), 1);
    assert_eq!(h.charts.updates_for("hourly-chart-downtown"), 1);
    assert!(h.display.events().contains(&DisplayEvent::Summary {
        entity: "downtown".to_string(),
        total: 40,
        peak: 9,
    }));
}

#[tokio::test(start_paused = true)]
async fn failed_stats_refresh_leaves_existing_charts_untouched() {
    let mut config = test_config(&[], &["downtown"]);
    config.stats_update_interval_ms = 10_000;
    let mut h = harness(&config);
    h.client.script("downtown", vec![Ok(4), Err(())]);

    h.engine.start();
    settle().await;
    assert_eq!(h.charts.updates_for("daily-chart-downtown"), 1);

    // The failing refresh and its retries render nothing; the charts from
    // the first pass stay up.
    tokio::time::sleep(Duration::from_millis(18_000)).await;
    assert_eq!(h.charts.updates_for("daily-chart-downtown"), 1);
    assert_eq!(h.charts.updates_for("hourly-chart-downtown"), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_cancels_future_passes_and_pending_retries() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Err(()), Ok(5)]);

    h.engine.start();
    settle().await;
    assert_eq!(h.client.fetch_count("cam-1"), 1);

    // Pause lands before the 2s retry timer fires; the retry must die with
    // the cycle.
    h.engine.pause();
    assert!(!h.engine.is_active());
    tokio::time::sleep(Duration::from_millis(30_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 1);

    // Resume starts a fresh pass immediately.
    h.engine.resume();
    assert!(h.engine.is_active());
    settle().await;
    assert_eq!(h.client.fetch_count("cam-1"), 2);
    assert_eq!(
        h.engine.registry().get(EntityKind::Counter, "cam-1").unwrap().last_value,
        5
    );
}

#[tokio::test(start_paused = true)]
async fn resume_while_active_does_not_double_poll() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Ok(1)]);

    h.engine.start();
    settle().await;
    h.engine.resume();
    h.engine.resume();
    settle().await;

    assert_eq!(h.client.fetch_count("cam-1"), 1);
    tokio::time::sleep(Duration::from_millis(60_000)).await;
    assert_eq!(h.client.fetch_count("cam-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn counter_animation_ramps_from_previous_to_new_value() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Ok(100)]);

    h.engine.start();
    // Let the full animation play out.
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    let texts = h.display.counter_texts("cam-1");
    assert!(texts.len() > 2, "expected intermediate animation frames");
    assert_eq!(texts.first().map(String::as_str), Some("0 people"));
    assert_eq!(texts.last().map(String::as_str), Some("100 people"));
    let values: Vec<u64> = texts.iter().map(|text| parse_people(text)).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test(start_paused = true)]
async fn newer_animation_supersedes_an_unfinished_one() {
    let mut config = test_config(&["cam-1"], &[]);
    // The second pass arrives mid-animation of the first.
    config.refresh_interval_ms = 500;
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Ok(1_000), Ok(2_000)]);

    h.engine.start();
    tokio::time::sleep(Duration::from_millis(3_000)).await;

    let texts = h.display.counter_texts("cam-1");
    assert_eq!(texts.last().map(String::as_str), Some("2,000 people"));
    // Once the second ramp begins the display never falls back below its
    // starting point.
    let values: Vec<u64> = texts.iter().map(|text| parse_people(text)).collect();
    let second_start = values
        .iter()
        .position(|value| *value >= 1_000)
        .expect("second ramp produced frames");
    assert!(values[second_start..].windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test(start_paused = true)]
async fn unchanged_counter_value_writes_a_single_final_frame() {
    let config = test_config(&["cam-1"], &[]);
    let mut h = harness(&config);
    h.client.script("cam-1", vec![Ok(3), Ok(3)]);

    h.engine.start();
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let after_first = h.display.counter_texts("cam-1").len();

    tokio::time::sleep(Duration::from_millis(60_000)).await;
    let texts = h.display.counter_texts("cam-1");
    // The second, unchanged fetch adds exactly one write, no frame loop.
    assert_eq!(texts.len(), after_first + 1);
    assert_eq!(texts.last().map(String::as_str), Some("3 people"));
}
