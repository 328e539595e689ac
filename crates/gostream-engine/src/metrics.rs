//! Simulated session metrics.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use gostream_ipc::LiveMetricsSample;

use crate::random::RandomSource;

/// Tuning for the metrics simulation.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Time between samples. Added to uptime on every sample.
    pub tick_interval: Duration,

    /// Viewers never drop below this once a sample has been produced.
    pub viewer_floor: u64,

    /// Largest per-destination viewer swing per tick.
    pub viewer_jitter: u32,

    /// Lowest bitrate drawn.
    pub bitrate_base_kbps: u32,

    /// Width of the bitrate band above the base.
    pub bitrate_band_kbps: u32,

    /// CPU with the encoder running and no destinations.
    pub cpu_base_percent: u32,

    /// CPU added per active destination.
    pub cpu_per_destination: u32,

    /// Width of the CPU jitter band.
    pub cpu_jitter_percent: u32,

    /// Samples kept for the analytics timeline.
    pub history_len: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            viewer_floor: 10,
            viewer_jitter: 5,
            bitrate_base_kbps: 5500,
            bitrate_band_kbps: 500,
            cpu_base_percent: 5,
            cpu_per_destination: 4,
            cpu_jitter_percent: 3,
            history_len: 60,
        }
    }
}

/// Produces one [`LiveMetricsSample`] per tick while the session is live.
#[derive(Debug)]
pub struct SessionMetricsEngine {
    config: MetricsConfig,
    current: LiveMetricsSample,
    history: VecDeque<LiveMetricsSample>,
    uptime: Duration,
}

impl SessionMetricsEngine {
    /// Create an engine at the idle baseline.
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_len),
            config,
            current: LiveMetricsSample::default(),
            uptime: Duration::ZERO,
        }
    }

    /// Tick interval.
    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }

    /// Latest sample, or the idle baseline.
    pub fn current(&self) -> LiveMetricsSample {
        self.current
    }

    /// Emitted samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &LiveMetricsSample> {
        self.history.iter()
    }

    /// Advance one tick with `active` destinations.
    ///
    /// Returns `None` without touching state when no destination is active.
    pub fn tick(
        &mut self,
        active: usize,
        rng: &mut impl RandomSource,
    ) -> Option<LiveMetricsSample> {
        if active == 0 {
            trace!("No active destinations, skipping metrics tick");
            return None;
        }

        let cfg = &self.config;
        let k = active as i64;
        let prev = self.current;

        let jitter = rng.between(1, cfg.viewer_jitter.max(1)) as i64;
        let sign = if rng.coin() { 1 } else { -1 };
        let viewers = (prev.viewers as i64 + sign * k * jitter).max(cfg.viewer_floor as i64);

        let bitrate_kbps = cfg.bitrate_base_kbps + rng.below(cfg.bitrate_band_kbps);
        let cpu_percent = cfg.cpu_base_percent
            + cfg.cpu_per_destination * active as u32
            + rng.below(cfg.cpu_jitter_percent);

        let sample = LiveMetricsSample {
            viewers: viewers as u64,
            bitrate_kbps,
            cpu_percent,
            uptime_seconds: (self.uptime + cfg.tick_interval).as_secs(),
        };

        self.current = sample;
        self.uptime += self.config.tick_interval;
        if self.history.len() == cfg.history_len {
            self.history.pop_front();
        }
        if cfg.history_len > 0 {
            self.history.push_back(sample);
        }

        debug!(
            viewers = sample.viewers,
            bitrate = sample.bitrate_kbps,
            cpu = sample.cpu_percent,
            uptime = sample.uptime_seconds,
            active,
            "Metrics tick"
        );
        Some(sample)
    }

    /// Return to the idle baseline and drop the timeline.
    pub fn reset(&mut self) {
        self.current = LiveMetricsSample::default();
        self.history.clear();
        self.uptime = Duration::ZERO;
    }
}

impl Default for SessionMetricsEngine {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedRandom};
    use gostream_ipc::IDLE_CPU_PERCENT;

    // Draw order per tick: viewer jitter, sign, bitrate, cpu jitter.

    #[test]
    fn test_zero_active_skips_tick() {
        let mut engine = SessionMetricsEngine::default();
        let mut rng = ScriptedRandom::new([4, 1, 100, 1]);

        assert_eq!(engine.tick(0, &mut rng), None);
        assert_eq!(engine.current(), LiveMetricsSample::default());
        assert_eq!(rng.remaining(), 4);
    }

    #[test]
    fn test_first_tick_is_floored() {
        let mut engine = SessionMetricsEngine::default();
        // jitter 1+4=5, sign up, bitrate +100, cpu +1
        let mut rng = ScriptedRandom::new([4, 1, 100, 1]);

        let sample = engine.tick(2, &mut rng).unwrap();

        assert_eq!(sample.viewers, 10); // 0 + 2*5 = 10
        assert_eq!(sample.bitrate_kbps, 5600);
        assert_eq!(sample.cpu_percent, 5 + 2 * 4 + 1);
        assert_eq!(sample.uptime_seconds, 3);
    }

    #[test]
    fn test_growth_scales_with_active_count() {
        let mut engine = SessionMetricsEngine::default();
        let mut rng = ScriptedRandom::new([0, 1, 0, 0, 2, 1, 0, 0, 2, 0, 0, 0]);

        engine.tick(4, &mut rng); // floor 10
        let up = engine.tick(4, &mut rng).unwrap(); // +4*3
        let down = engine.tick(4, &mut rng).unwrap(); // -4*3

        assert_eq!(up.viewers, 22);
        assert_eq!(down.viewers, 10);
        assert_eq!(down.uptime_seconds, 9);
    }

    #[test]
    fn test_viewers_never_below_floor() {
        let mut engine = SessionMetricsEngine::default();
        let mut rng = RngSource::seeded(7);

        for _ in 0..500 {
            let sample = engine.tick(3, &mut rng).unwrap();
            assert!(sample.viewers >= 10);
            assert!((5500..6000).contains(&sample.bitrate_kbps));
            assert!((17..20).contains(&sample.cpu_percent));
        }
    }

    #[test]
    fn test_reset_returns_to_baseline() {
        let mut engine = SessionMetricsEngine::default();
        let mut rng = RngSource::seeded(1);
        engine.tick(1, &mut rng);
        engine.tick(1, &mut rng);

        engine.reset();

        assert_eq!(
            engine.current(),
            LiveMetricsSample {
                viewers: 0,
                bitrate_kbps: 0,
                cpu_percent: IDLE_CPU_PERCENT,
                uptime_seconds: 0,
            }
        );
        assert_eq!(engine.history().count(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut engine = SessionMetricsEngine::new(MetricsConfig {
            history_len: 3,
            ..Default::default()
        });
        let mut rng = RngSource::seeded(3);
        for _ in 0..5 {
            engine.tick(1, &mut rng);
        }

        let uptimes: Vec<_> = engine.history().map(|s| s.uptime_seconds).collect();
        assert_eq!(uptimes, vec![9, 12, 15]);
    }
}
