use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Frame pacing for the movement step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Frames closer together than this are dropped.
    #[serde(default = "default_min_interval")]
    pub min_interval: Duration,
    /// Upper bound on the step handed to the integrator.
    #[serde(default = "default_max_step")]
    pub max_step: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            min_interval: default_min_interval(),
            max_step: default_max_step(),
        }
    }
}

fn default_min_interval() -> Duration {
    Duration::from_micros(8_330)
}

fn default_max_step() -> Duration {
    Duration::from_millis(100)
}

/// Drops frames that arrive faster than the configured rate. Nothing is queued.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    config: FrameConfig,
    last: Option<Duration>,
}

impl FrameLimiter {
    pub fn new(config: FrameConfig) -> Self {
        Self { config, last: None }
    }

    /// Returns the step in seconds when the frame at `now` should run.
    pub fn admit(&mut self, now: Duration) -> Option<f32> {
        let step = match self.last {
            None => Duration::ZERO,
            Some(last) => {
                let since = now.checked_sub(last)?;
                if since < self.config.min_interval {
                    return None;
                }
                since.min(self.config.max_step)
            }
        };
        self.last = Some(now);
        Some(step.as_secs_f32())
    }
}

/// Shortest period an [`Interval`] will run at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Fixed-period schedule, used for the 1 Hz countdown.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Option<Duration>,
}

impl Interval {
    /// Periods below [`MIN_PERIOD`] are raised to it.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            next: None,
        }
    }

    /// Starts the schedule; the first firing is one period after `now`.
    pub fn arm(&mut self, now: Duration) {
        if self.next.is_none() {
            self.next = Some(now.saturating_add(self.period));
        }
    }

    pub fn disarm(&mut self) {
        self.next = None;
    }

    /// Fires at most once per call; missed periods are skipped, not replayed.
    pub fn poll(&mut self, now: Duration) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        if now < next {
            return false;
        }
        let missed = (now - next).as_nanos() / self.period.as_nanos();
        let skip = u32::try_from(missed.saturating_add(1)).unwrap_or(u32::MAX);
        self.next = Some(next.saturating_add(self.period.saturating_mul(skip)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn fast_frames_are_dropped() {
        let mut limiter = FrameLimiter::new(FrameConfig::default());
        assert_eq!(limiter.admit(ms(0)), Some(0.0));
        assert_eq!(limiter.admit(ms(4)), None);
        assert_eq!(limiter.admit(ms(8)), None);
        let step = limiter.admit(ms(16)).unwrap();
        assert!((step - 0.016).abs() < 1e-6);
    }

    #[test]
    fn long_gaps_are_clamped() {
        let mut limiter = FrameLimiter::new(FrameConfig::default());
        limiter.admit(ms(0));
        let step = limiter.admit(ms(5_000)).unwrap();
        assert!((step - 0.1).abs() < 1e-6);
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let mut limiter = FrameLimiter::new(FrameConfig::default());
        limiter.admit(ms(100));
        assert_eq!(limiter.admit(ms(50)), None);
    }

    #[test]
    fn interval_fires_once_per_period() {
        let mut interval = Interval::new(Duration::from_secs(1));
        assert!(!interval.poll(ms(5_000)));
        interval.arm(ms(0));
        assert!(!interval.poll(ms(999)));
        assert!(interval.poll(ms(1_000)));
        assert!(!interval.poll(ms(1_500)));
        assert!(interval.poll(ms(4_200)));
        assert!(!interval.poll(ms(4_900)));
        assert!(interval.poll(ms(5_000)));
        interval.disarm();
        assert!(!interval.poll(ms(9_000)));
    }

    #[test]
    fn zero_period_is_raised_to_the_minimum() {
        let mut interval = Interval::new(Duration::ZERO);
        interval.arm(ms(0));
        assert!(!interval.poll(Duration::from_micros(500)));
        assert!(interval.poll(ms(1)));
        assert!(interval.poll(Duration::from_secs(3_600)));
        assert!(!interval.poll(Duration::from_secs(3_600)));
    }
}
