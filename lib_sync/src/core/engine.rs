//! # Sync Engine and Lifecycle Controller
//!
//! The coordinator that wires the registry, source client, retry controller,
//! scheduler and sinks into one running engine. It is constructed with
//! injected collaborators rather than ambient globals, so every seam can be
//! replaced by a test double.
//!
//! ## Control flow
//!
//! The scheduler fires a pass; the pass walks its entities in registration
//! order, one fetch at a time. A success updates registry state and flows to
//! the display (animated, for counters) or to the chart and summary sinks
//! (for stat groups). A failure is absorbed by the retry controller, which
//! either schedules a one-shot delayed retry or raises the persistent error
//! indicator. No single entity's failure ever aborts the rest of a pass.
//!
//! ## Lifecycle
//!
//! Visibility events map directly onto the scheduler: hidden pauses both
//! cycles, visible resumes them with a fresh immediate pass. Pausing only
//! prevents future timer firings; a result that was already in flight is
//! still applied when it arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::configs::config_engine::EngineConfig;
use crate::core::interpolate::{AnimationTracker, Interpolation, FRAME_INTERVAL};
use crate::core::registry::{EntityKind, EntityRegistry, RegistryError};
use crate::core::retry::{RetryController, RetryDecision, RetryPolicy};
use crate::core::scheduler::PollScheduler;
use crate::models::{CounterSnapshot, StatGroupSnapshot};
use crate::retrieve::source_client::{FetchError, SourceClient};
use crate::sinks::{format_people, ChartSink, DisplaySink};

/// Static indicator message for a camera whose retry budget is spent.
pub const COUNTER_ERROR_MESSAGE: &str = "Camera feed unavailable";
/// Static indicator message for a branch whose retry budget is spent.
pub const STATS_ERROR_MESSAGE: &str = "Failed to update statistics";

/// Page visibility, as reported by the embedding UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

fn error_message(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Counter => COUNTER_ERROR_MESSAGE,
        EntityKind::StatGroup => STATS_ERROR_MESSAGE,
    }
}

/// The polling/reconciliation engine for one dashboard session.
pub struct SyncEngine {
    core: Arc<EngineCore>,
    scheduler: PollScheduler,
}

impl SyncEngine {
    /// Registers the configured fixed entity set and wires the engine.
    ///
    /// Duplicate ids are surfaced here, at registration time, and are fatal;
    /// they can never occur later during normal polling.
    pub fn bootstrap(
        config: &EngineConfig,
        client: Arc<dyn SourceClient>,
        display: Arc<dyn DisplaySink>,
        charts: Arc<dyn ChartSink>,
    ) -> Result<Self, RegistryError> {
        let registry = Arc::new(EntityRegistry::new());
        for camera in &config.cameras {
            registry.register(EntityKind::Counter, camera)?;
        }
        for branch in &config.branches {
            registry.register(EntityKind::StatGroup, branch)?;
        }
        info!(
            cameras = config.cameras.len(),
            branches = config.branches.len(),
            "entity set registered"
        );

        let retry = RetryController::new(
            Arc::clone(&registry),
            RetryPolicy {
                max_attempts: config.max_retry_attempts,
                delay: config.retry_delay(),
            },
        );
        let scheduler = PollScheduler::new(config.refresh_interval(), config.stats_update_interval());
        let core = Arc::new(EngineCore {
            registry,
            retry,
            client,
            display,
            charts,
            animations: AnimationTracker::default(),
            animation_duration: config.animation_duration(),
        });
        Ok(Self { core, scheduler })
    }

    /// Starts both polling cycles, each beginning with an immediate pass.
    pub fn start(&mut self) {
        self.activate();
        info!("polling started");
    }

    /// Cancels both cycles' pending timers and any pending retry timers.
    pub fn pause(&mut self) {
        self.scheduler.pause();
        info!("polling paused");
    }

    /// Restarts both cycles from a fresh pass. A cycle that is still active
    /// is left alone, so pause/resume can never double-schedule.
    pub fn resume(&mut self) {
        self.activate();
        info!("polling resumed");
    }

    fn activate(&mut self) {
        let core = Arc::clone(&self.core);
        self.scheduler.counter_cycle().start(move |token| {
            let core = Arc::clone(&core);
            async move { EngineCore::run_counter_pass(&core, &token).await }
        });
        let core = Arc::clone(&self.core);
        self.scheduler.stats_cycle().start(move |token| {
            let core = Arc::clone(&core);
            async move { EngineCore::run_stats_pass(&core, &token).await }
        });
    }

    /// True while at least one cycle owns a pending timer.
    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Shared handle to the entity registry, for state inspection.
    pub fn registry(&self) -> Arc<EntityRegistry> {
        Arc::clone(&self.core.registry)
    }

    /// Runs the engine until the visibility event stream closes, mapping
    /// hidden/visible onto pause/resume.
    pub async fn run(mut self, mut visibility: mpsc::Receiver<Visibility>) {
        self.start();
        while let Some(event) = visibility.recv().await {
            match event {
                Visibility::Hidden => self.pause(),
                Visibility::Visible => self.resume(),
            }
        }
        debug!("visibility stream closed, engine loop ending");
    }
}

/// Shared state and behavior behind the spawned cycle, retry and animation
/// tasks.
///
/// Functions that spawn follow-up tasks take `core: &Arc<Self>` explicitly
/// so the spawned future can hold its own strong handle.
struct EngineCore {
    registry: Arc<EntityRegistry>,
    retry: RetryController,
    client: Arc<dyn SourceClient>,
    display: Arc<dyn DisplaySink>,
    charts: Arc<dyn ChartSink>,
    animations: AnimationTracker,
    animation_duration: Duration,
}

impl EngineCore {
    async fn run_counter_pass(core: &Arc<Self>, token: &CancellationToken) {
        let ids = core.registry.counter_ids();
        debug!(entities = ids.len(), "counter pass started");
        for id in &ids {
            if token.is_cancelled() {
                debug!("counter pass interrupted");
                return;
            }
            Self::poll_entity(core, EntityKind::Counter, id, token).await;
        }
        debug!("counter pass complete");
    }

    async fn run_stats_pass(core: &Arc<Self>, token: &CancellationToken) {
        let ids = core.registry.stat_group_ids();
        debug!(entities = ids.len(), "stats pass started");
        for id in &ids {
            if token.is_cancelled() {
                debug!("stats pass interrupted");
                return;
            }
            Self::poll_entity(core, EntityKind::StatGroup, id, token).await;
        }
        debug!("stats pass complete");
    }

    /// One fetch for one entity, with the outcome applied immediately.
    async fn poll_entity(core: &Arc<Self>, kind: EntityKind, id: &str, token: &CancellationToken) {
        if let Err(err) = Self::fetch_and_apply(core, kind, id).await {
            Self::handle_fetch_failure(core, kind, id, err, token);
        }
    }

    async fn fetch_and_apply(core: &Arc<Self>, kind: EntityKind, id: &str) -> Result<(), FetchError> {
        match kind {
            EntityKind::Counter => {
                let snapshot = core.client.fetch_counter(id).await?;
                Self::apply_counter(core, id, snapshot);
            }
            EntityKind::StatGroup => {
                let snapshot = core.client.fetch_stat_group(id).await?;
                core.apply_stat_group(id, snapshot);
            }
        }
        Ok(())
    }

    fn apply_counter(core: &Arc<Self>, id: &str, snapshot: CounterSnapshot) {
        let record = match core
            .registry
            .record_success(EntityKind::Counter, id, Some(snapshot.current_count))
        {
            Ok(record) => record,
            Err(err) => {
                error!(entity = id, error = %err, "registry rejected counter success");
                return;
            }
        };
        if record.was_errored {
            info!(entity = id, "camera feed recovered");
        }
        core.display.set_error_visible(id, false, "");
        core.display.set_hour_total(id, snapshot.hour_total);
        core.display.set_daily_total(id, snapshot.daily_total);
        Self::animate_counter(core, id, record.previous_value, snapshot.current_count);
    }

    fn apply_stat_group(&self, id: &str, snapshot: StatGroupSnapshot) {
        let record = match self.registry.record_success(EntityKind::StatGroup, id, None) {
            Ok(record) => record,
            Err(err) => {
                error!(entity = id, error = %err, "registry rejected stats success");
                return;
            }
        };
        if record.was_errored {
            info!(entity = id, "branch statistics recovered");
        }
        self.display.set_error_visible(id, false, "");
        self.charts.render_or_update(
            &format!("daily-chart-{id}"),
            &snapshot.daily_chart.data,
            &snapshot.daily_chart.layout,
        );
        self.charts.render_or_update(
            &format!("hourly-chart-{id}"),
            &snapshot.hourly_chart.data,
            &snapshot.hourly_chart.layout,
        );
        self.display.set_summary(id, &snapshot.summary);
    }

    /// Routes one failure through the retry controller.
    ///
    /// A scheduled retry runs on its own one-shot timer, independent of the
    /// owning cycle's interval, and is torn down with the cycle on pause via
    /// a child token.
    fn handle_fetch_failure(
        core: &Arc<Self>,
        kind: EntityKind,
        id: &str,
        err: FetchError,
        token: &CancellationToken,
    ) {
        warn!(entity = id, kind = ?kind, class = ?err.kind(), error = %err, "fetch failed");
        match core.retry.on_failure(kind, id) {
            Ok(RetryDecision::Retry { attempt, delay }) => {
                debug!(entity = id, attempt, delay_ms = delay.as_millis() as u64, "retry scheduled");
                Self::spawn_retry(core, kind, id.to_string(), delay, token.child_token());
            }
            Ok(RetryDecision::GiveUp) => {
                error!(entity = id, kind = ?kind, "retry budget exhausted, entity errored");
                core.display.set_error_visible(id, true, error_message(kind));
            }
            Err(err) => {
                // Only reachable if an unregistered id leaked into a pass.
                error!(entity = id, error = %err, "registry rejected failure record");
            }
        }
    }

    fn spawn_retry(
        core: &Arc<Self>,
        kind: EntityKind,
        id: String,
        delay: Duration,
        token: CancellationToken,
    ) {
        let core = Arc::clone(core);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(entity = %id, "pending retry cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            debug!(entity = %id, "retry fetch");
            if let Err(err) = Self::fetch_and_apply(&core, kind, &id).await {
                Self::handle_fetch_failure(&core, kind, &id, err, &token);
            }
        });
    }

    /// Ramps the displayed counter text from the previous value to the new
    /// one over the configured duration, sampled by elapsed runtime time.
    ///
    /// A newer animation for the same camera supersedes this one; the stale
    /// frame loop notices before its next write and stops.
    fn animate_counter(core: &Arc<Self>, id: &str, from: u64, to: u64) {
        let generation = core.animations.begin(id);
        if from == to {
            core.display.set_counter_text(id, &format_people(to));
            return;
        }
        let core = Arc::clone(core);
        let id = id.to_string();
        let ramp = Interpolation::new(from, to, core.animation_duration);
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            loop {
                if core.animations.current(&id) != generation {
                    debug!(entity = %id, "animation superseded");
                    return;
                }
                let elapsed = started.elapsed();
                core.display
                    .set_counter_text(&id, &format_people(ramp.value_at(elapsed)));
                if ramp.is_finished(elapsed) {
                    return;
                }
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
        });
    }
}
