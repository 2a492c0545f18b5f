//! # Value Interpolator
//!
//! Smooths displayed counter values across polling intervals. A fetched
//! jump from 40 to 100 people is shown as a one-second ramp rather than an
//! instant replacement.
//!
//! [`Interpolation`] is a pure description of that ramp, sampled by
//! wall-clock elapsed time rather than frame count. Generation of values and
//! their consumption by the display sink are separate concerns: the engine
//! drives frames from a tokio task, while tests sample the ramp directly
//! with synthetic elapsed times.
//!
//! Overlapping animations for the same display target are resolved by the
//! [`AnimationTracker`]: each new animation bumps the target's generation,
//! and a superseded frame loop stops before its next write.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Default ramp length, matching one counter-text animation.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(1000);
/// Delay between successive display writes while a ramp is running.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A finite linear ramp between two displayed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolation {
    start: u64,
    end: u64,
    duration: Duration,
}

impl Interpolation {
    pub fn new(start: u64, end: u64, duration: Duration) -> Self {
        Self { start, end, duration }
    }

    /// Samples the ramp at a given elapsed time.
    ///
    /// Intermediate values are floored; once `elapsed` reaches the duration
    /// the result is exactly the end value, and it never changes again.
    pub fn value_at(&self, elapsed: Duration) -> u64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.end;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let from = self.start as f64;
        let to = self.end as f64;
        (from + (to - from) * progress).floor() as u64
    }

    /// True once the terminal value has been reached.
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    pub fn end(&self) -> u64 {
        self.end
    }
}

/// Per-target generation counters for in-flight animations.
///
/// `begin` hands out a new generation for a target; a frame loop keeps
/// writing only while `current` still returns its own generation.
#[derive(Default)]
pub struct AnimationTracker {
    generations: Mutex<HashMap<String, u64>>,
}

impl AnimationTracker {
    /// Starts a new animation for a target, superseding any running one.
    pub fn begin(&self, target: &str) -> u64 {
        let mut generations = self.generations.lock().expect("Animation lock poisoned");
        let entry = generations.entry(target.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// The generation of the most recently started animation for a target.
    pub fn current(&self, target: &str) -> u64 {
        let generations = self.generations.lock().expect("Animation lock poisoned");
        generations.get(target).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_are_exact() {
        let ramp = Interpolation::new(0, 100, Duration::from_millis(1000));
        assert_eq!(ramp.value_at(Duration::ZERO), 0);
        assert_eq!(ramp.value_at(Duration::from_millis(1000)), 100);
        assert_eq!(ramp.value_at(Duration::from_millis(5000)), 100);
    }

    #[test]
    fn midpoint_is_half_way() {
        let ramp = Interpolation::new(0, 100, Duration::from_millis(1000));
        let mid = ramp.value_at(Duration::from_millis(500));
        assert!((49..=51).contains(&mid), "midpoint was {mid}");
    }

    #[test]
    fn values_are_floored() {
        let ramp = Interpolation::new(0, 10, Duration::from_millis(1000));
        // 10 * 0.05 = 0.5, floored to 0.
        assert_eq!(ramp.value_at(Duration::from_millis(50)), 0);
        // 10 * 0.15 = 1.5, floored to 1.
        assert_eq!(ramp.value_at(Duration::from_millis(150)), 1);
    }

    #[test]
    fn decreasing_ramp_floors_toward_lower_bound() {
        let ramp = Interpolation::new(100, 0, Duration::from_millis(1000));
        assert_eq!(ramp.value_at(Duration::ZERO), 100);
        assert_eq!(ramp.value_at(Duration::from_millis(500)), 50);
        assert_eq!(ramp.value_at(Duration::from_millis(1000)), 0);
    }

    #[test]
    fn ramp_is_monotonic() {
        let ramp = Interpolation::new(3, 250, Duration::from_millis(1000));
        let mut previous = 0;
        for ms in (0..=1000).step_by(50) {
            let value = ramp.value_at(Duration::from_millis(ms));
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(previous, 250);
    }

    #[test]
    fn zero_duration_jumps_straight_to_the_end() {
        let ramp = Interpolation::new(4, 9, Duration::ZERO);
        assert_eq!(ramp.value_at(Duration::ZERO), 9);
        assert!(ramp.is_finished(Duration::ZERO));
    }

    #[test]
    fn finished_exactly_at_duration() {
        let ramp = Interpolation::new(0, 1, Duration::from_millis(1000));
        assert!(!ramp.is_finished(Duration::from_millis(999)));
        assert!(ramp.is_finished(Duration::from_millis(1000)));
    }

    #[test]
    fn tracker_supersedes_older_generations() {
        let tracker = AnimationTracker::default();
        let first = tracker.begin("counter-cam-1");
        assert_eq!(tracker.current("counter-cam-1"), first);

        let second = tracker.begin("counter-cam-1");
        assert!(second > first);
        assert_eq!(tracker.current("counter-cam-1"), second);
        // Targets are independent of each other.
        assert_eq!(tracker.current("counter-cam-2"), 0);
    }
}
