//! Smoothed frame-rate measurement for the render loop.

use std::time::{Duration, Instant};

/// Exponential moving average of frame time, reported as whole frames per second.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    smoothing: f64,
    max_delta: Duration,
    last_frame: Option<Instant>,
    avg_frame_ms: Option<f64>,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl FpsMeter {
    /// `smoothing` is the weight of the newest sample, in (0, 1].
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing: smoothing.clamp(f64::EPSILON, 1.0),
            max_delta: Duration::from_secs(1),
            last_frame: None,
            avg_frame_ms: None,
        }
    }

    /// Record a frame at `now` and return the rounded smoothed rate.
    ///
    /// The first frame has no delta to measure and reports 0. Gaps longer
    /// than a second (a suspended tab, a debugger) count as one second.
    pub fn sample(&mut self, now: Instant) -> u32 {
        if let Some(last) = self.last_frame.replace(now) {
            let delta = now.saturating_duration_since(last).min(self.max_delta);
            let delta_ms = delta.as_secs_f64() * 1000.0;
            self.avg_frame_ms = Some(match self.avg_frame_ms {
                Some(avg) => avg + (delta_ms - avg) * self.smoothing,
                None => delta_ms,
            });
        }
        self.fps()
    }

    /// Current smoothed rate without recording a frame.
    pub fn fps(&self) -> u32 {
        match self.avg_frame_ms {
            Some(avg) if avg > 0.0 => (1000.0 / avg).round() as u32,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_reports_zero() {
        let mut meter = FpsMeter::default();
        assert_eq!(meter.sample(Instant::now()), 0);
    }

    #[test]
    fn test_steady_rate() {
        let mut meter = FpsMeter::default();
        let t0 = Instant::now();
        let mut fps = 0;
        for i in 0..=120u64 {
            fps = meter.sample(t0 + Duration::from_micros(i * 16_667));
        }
        assert_eq!(fps, 60);
    }

    #[test]
    fn test_smoothing_damps_a_single_spike() {
        let mut meter = FpsMeter::default();
        let t0 = Instant::now();
        let mut t = t0;
        for _ in 0..60 {
            meter.sample(t);
            t += Duration::from_millis(10);
        }
        assert_eq!(meter.fps(), 100);

        // One 100ms hitch moves the average, but nowhere near 10 fps.
        t += Duration::from_millis(90);
        let after_spike = meter.sample(t);
        assert!(after_spike > 40 && after_spike < 100, "{after_spike}");
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut meter = FpsMeter::new(1.0);
        let t0 = Instant::now();
        meter.sample(t0);
        assert_eq!(meter.sample(t0 + Duration::from_secs(30)), 1);
    }
}
