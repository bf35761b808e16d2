use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

/// Multiplicative backoff with additive jitter.
///
/// Each call to [`Backoff::next_delay`] yields `min(base + jitter, max_delay)`
/// and then grows `base` by `multiplier`, itself capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    base: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            base: policy.initial_delay.min(policy.max_delay),
            policy,
        }
    }

    /// Base delay the next call will start from, before jitter.
    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn next_delay(&mut self, jitter: &dyn JitterSource) -> Duration {
        let delay = (self.base + jitter.jitter(self.policy.max_jitter)).min(self.policy.max_delay);
        let grown_ms = (self.base.as_millis() as f64 * self.policy.multiplier.max(1.0)).round();
        self.base = Duration::from_millis(grown_ms as u64).min(self.policy.max_delay);
        delay
    }

    pub fn reset(&mut self) {
        self.base = self.policy.initial_delay.min(self.policy.max_delay);
    }
}

pub trait JitterSource: Send + Sync {
    /// A value in `0..=max`.
    fn jitter(&self, max: Duration) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn jitter(&self, max: Duration) -> Duration {
        self.0.min(max)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_grows_by_multiplier_until_cap() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        let no_jitter = FixedJitter(Duration::ZERO);
        assert_eq!(backoff.next_delay(&no_jitter), Duration::from_millis(2000));
        assert_eq!(backoff.next_delay(&no_jitter), Duration::from_millis(2400));
        assert_eq!(backoff.next_delay(&no_jitter), Duration::from_millis(2880));
        for _ in 0..20 {
            assert!(backoff.next_delay(&no_jitter) <= DEFAULT_MAX_DELAY);
        }
        assert_eq!(backoff.base(), DEFAULT_MAX_DELAY);
        backoff.reset();
        assert_eq!(backoff.base(), DEFAULT_INITIAL_DELAY);
    }

    #[test]
    fn jittered_delays_stay_in_range() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        for _ in 0..30 {
            let base = backoff.base();
            let delay = backoff.next_delay(&RandomJitter);
            assert!(delay >= base.min(DEFAULT_MAX_DELAY));
            assert!(delay <= (base + DEFAULT_MAX_JITTER).min(DEFAULT_MAX_DELAY));
        }
    }

    #[test]
    fn jitter_is_capped_by_policy_max() {
        let policy = BackoffPolicy {
            max_jitter: Duration::from_millis(100),
            ..BackoffPolicy::default()
        };
        let mut backoff = Backoff::new(policy);
        let delay = backoff.next_delay(&FixedJitter(Duration::from_secs(5)));
        assert_eq!(delay, Duration::from_millis(2100));
    }
}
