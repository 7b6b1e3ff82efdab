//! Randomized pauses around interactive actions.
//!
//! The target site scores sessions on timing regularity, so every click,
//! scroll and page view is surrounded by a pause drawn from a configured
//! range. Pauses go through a [`Clock`] so tests can observe them without
//! actually waiting.

use async_trait::async_trait;
use jobhound_core::{DelayRange, PacingConfig};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of suspension for pauses.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that records requested pauses and returns immediately.
///
/// Used for offline replays and tests, where wall-clock waiting buys nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    /// Create an empty recording clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far, in order.
    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Sum of all requested pauses.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.pauses().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}

/// Draws and applies jittered pauses.
#[derive(Clone)]
pub struct Pacer {
    config: PacingConfig,
    clock: Arc<dyn Clock>,
}

impl Pacer {
    /// Create a pacer that sleeps on the tokio timer.
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Create a pacer with a custom clock.
    #[must_use]
    pub fn with_clock(config: PacingConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// The configured ranges.
    #[must_use]
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Draw a duration uniformly from `range`.
    #[must_use]
    pub fn sample(range: &DelayRange) -> Duration {
        let (low, high) = if range.min_ms <= range.max_ms {
            (range.min_ms, range.max_ms)
        } else {
            (range.max_ms, range.min_ms)
        };
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    /// Pause for a duration drawn from `range`.
    pub async fn pause(&self, range: &DelayRange) {
        let duration = Self::sample(range);
        tracing::trace!("pausing for {:?}", duration);
        self.clock.sleep(duration).await;
    }

    /// Mouse button hold time for a click, in milliseconds.
    #[must_use]
    pub fn click_delay_ms(&self) -> u64 {
        u64::try_from(Self::sample(&self.config.click_delay).as_millis()).unwrap_or(u64::MAX)
    }

    /// Random point inside a viewport, keeping `margin` pixels from each edge.
    ///
    /// Returns `None` when the viewport is too small to leave any room.
    #[must_use]
    pub fn wander_point(viewport: (u32, u32), margin: u32) -> Option<(f64, f64)> {
        let (width, height) = viewport;
        if width <= margin * 2 || height <= margin * 2 {
            return None;
        }
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(margin..=width - margin);
        let y = rng.gen_range(margin..=height - margin);
        Some((f64::from(x), f64::from(y)))
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_range() {
        let range = DelayRange::new(300, 800);
        for _ in 0..100 {
            let d = Pacer::sample(&range);
            assert!(d >= Duration::from_millis(300) && d <= Duration::from_millis(800));
        }
    }

    #[test]
    fn test_sample_fixed_range() {
        let range = DelayRange::new(300, 300);
        assert_eq!(Pacer::sample(&range), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_recording_clock_observes_pauses() {
        let clock = RecordingClock::new();
        let pacer = Pacer::with_clock(PacingConfig::default(), Arc::new(clock.clone()));

        pacer.pause(&pacer.config().detail_dwell).await;
        pacer.pause(&pacer.config().pointer_settle).await;

        let pauses = clock.pauses();
        assert_eq!(pauses.len(), 2);
        assert!(pauses[0] >= Duration::from_millis(2000));
        assert!(pauses[1] <= Duration::from_millis(500));
    }

    #[test]
    fn test_click_delay_in_range() {
        let pacer = Pacer::new(PacingConfig::default());
        for _ in 0..50 {
            let delay = pacer.click_delay_ms();
            assert!((32..=512).contains(&delay));
        }
    }

    #[test]
    fn test_wander_point_respects_margin() {
        for _ in 0..50 {
            let (x, y) = Pacer::wander_point((1280, 720), 100).expect("room to wander");
            assert!((100.0..=1180.0).contains(&x));
            assert!((100.0..=620.0).contains(&y));
        }
        assert!(Pacer::wander_point((150, 720), 100).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_sleeps() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(250)).await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
