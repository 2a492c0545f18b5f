//! # Poll Scheduler
//!
//! Drives the two periodic polling cycles: the fast per-camera counter
//! cycle and the slow per-branch stat-group cycle. Each cycle is a
//! self-rescheduling loop, not a fixed-rate timer: a full pass runs to
//! completion, then the cycle sleeps its interval before the next pass, so
//! slow fetches can never cause overlapping rounds within a cycle.
//!
//! A cycle owns exactly one `CancellationToken` and one task handle while
//! active. `pause` cancels the token and releases the handle; `resume`
//! starts a fresh pass immediately. Starting an already-active cycle is a
//! no-op, so a cycle can never be double-scheduled.
//!
//! Cancellation only prevents future firings. A pass that is mid-flight
//! observes the token between entities and stops at the next boundary; the
//! one genuinely in-flight fetch completes and its result is still applied.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One self-rescheduling polling loop.
pub struct PollCycle {
    name: &'static str,
    interval: Duration,
    token: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl PollCycle {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            token: None,
            task: None,
        }
    }

    /// Whether this cycle currently owns a pending timer.
    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the cycle loop: run a pass, sleep the interval, repeat.
    ///
    /// `run_pass` is invoked once per round with a token clone so the pass
    /// can stop early at an entity boundary after cancellation. If the cycle
    /// is already active this does nothing.
    pub fn start<F, Fut>(&mut self, run_pass: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_active() {
            debug!(cycle = self.name, "cycle already active, not rescheduling");
            return;
        }
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let interval = self.interval;
        let name = self.name;
        let task = tokio::spawn(async move {
            loop {
                run_pass(loop_token.clone()).await;
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!(cycle = name, "cycle loop stopped");
        });
        self.token = Some(token);
        self.task = Some(task);
        debug!(cycle = self.name, interval_ms = interval.as_millis() as u64, "cycle scheduled");
    }

    /// Cancels the pending timer, if any. In-flight work is not interrupted.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
            debug!(cycle = self.name, "cycle cancelled");
        }
        self.task.take();
    }
}

impl Drop for PollCycle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The pair of independent cycles making up the polling engine.
pub struct PollScheduler {
    counter_cycle: PollCycle,
    stats_cycle: PollCycle,
}

impl PollScheduler {
    pub fn new(refresh_interval: Duration, stats_update_interval: Duration) -> Self {
        Self {
            counter_cycle: PollCycle::new("counters", refresh_interval),
            stats_cycle: PollCycle::new("stats", stats_update_interval),
        }
    }

    pub fn counter_cycle(&mut self) -> &mut PollCycle {
        &mut self.counter_cycle
    }

    pub fn stats_cycle(&mut self) -> &mut PollCycle {
        &mut self.stats_cycle
    }

    /// Cancels both cycles' pending timers.
    pub fn pause(&mut self) {
        self.counter_cycle.cancel();
        self.stats_cycle.cancel();
    }

    /// True while either cycle owns a pending timer.
    pub fn is_active(&self) -> bool {
        self.counter_cycle.is_active() || self.stats_cycle.is_active()
    }
}
