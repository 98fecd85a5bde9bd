//! Backoff configuration.

use std::time::Duration;

use super::error::RetryError;

/// Default cap on the doubled delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// How many attempts to make and how long to wait between them.
///
/// A `Backoff` is pure data: it describes the schedule but never sleeps.
/// The delay starts at `initial_delay` and doubles after every wait, capped
/// at `max_delay`. The time actually waited is the delay with jitter
/// applied, which by default adds one fifth.
///
/// # Examples
///
/// ```rust
/// use faultline::retry::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::new(4, Duration::from_millis(100));
///
/// // Three waits between four attempts: 100ms, 200ms and 400ms plus 20%.
/// assert_eq!(
///     backoff.schedule(),
///     vec![
///         Duration::from_millis(120),
///         Duration::from_millis(240),
///         Duration::from_millis(480),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    jitter: Jitter,
}

/// Adjustment applied to a delay to get the time actually waited.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Jitter {
    /// Wait exactly the delay.
    None,
    /// Wait the delay plus a fifth of it.
    #[default]
    Fixed,
    /// Wait a random time within ±factor of the delay.
    ///
    /// **Note**: Requires the `jitter` feature. Without it the delay is used
    /// unchanged.
    Proportional(f64),
}

impl Backoff {
    /// `max_attempts` total attempts, starting from `initial_delay`, with
    /// the default cap and fixed jitter.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Backoff {
            max_attempts,
            initial_delay,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: Jitter::Fixed,
        }
    }

    /// Set the cap on the doubled delay.
    ///
    /// ```rust
    /// use faultline::retry::{Backoff, Jitter};
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::new(5, Duration::from_millis(100))
    ///     .with_max_delay(Duration::from_millis(250))
    ///     .with_jitter(Jitter::None);
    ///
    /// assert_eq!(
    ///     backoff.schedule(),
    ///     vec![
    ///         Duration::from_millis(100),
    ///         Duration::from_millis(200),
    ///         Duration::from_millis(250),
    ///         Duration::from_millis(250),
    ///     ]
    /// );
    /// ```
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the jitter strategy. Proportional factors are clamped to `0..=1`.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = match jitter {
            Jitter::Proportional(factor) => Jitter::Proportional(factor.clamp(0.0, 1.0)),
            other => other,
        };
        self
    }

    /// Wait exactly the delay.
    pub fn without_jitter(self) -> Self {
        self.with_jitter(Jitter::None)
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt, before jitter.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Cap on the doubled delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// The jitter strategy.
    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }

    /// Reject configurations that cannot make a single attempt.
    pub fn validate(&self) -> Result<(), RetryError> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidMaxAttempts {
                max_attempts: self.max_attempts,
            });
        }
        Ok(())
    }

    /// Time actually waited for `delay`.
    pub fn wait_for(&self, delay: Duration) -> Duration {
        self.jitter.apply(delay)
    }

    /// The delay that follows `delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }

    /// Every wait a run that never succeeds would make.
    ///
    /// Random jitter makes the schedule differ between calls.
    pub fn schedule(&self) -> Vec<Duration> {
        let waits = self.max_attempts.saturating_sub(1) as usize;
        let mut delay = self.initial_delay;
        let mut schedule = Vec::with_capacity(waits);
        for _ in 0..waits {
            schedule.push(self.wait_for(delay));
            delay = self.next_delay(delay);
        }
        schedule
    }
}

impl Jitter {
    /// Apply jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Fixed => delay.saturating_add(delay / 5),
            #[cfg(feature = "jitter")]
            Jitter::Proportional(factor) => {
                use rand::Rng;
                let secs = delay.as_secs_f64();
                let range = secs * factor;
                let min = (secs - range).max(0.0);
                let max = secs + range;
                if max <= min {
                    return delay;
                }
                let jittered = rand::rng().random_range(min..=max);
                Duration::try_from_secs_f64(jittered).unwrap_or(delay)
            }
            #[cfg(not(feature = "jitter"))]
            Jitter::Proportional(_) => delay,
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let backoff = Backoff::new(3, Duration::from_millis(100));

        assert_eq!(backoff.max_attempts(), 3);
        assert_eq!(backoff.initial_delay(), Duration::from_millis(100));
        assert_eq!(backoff.max_delay(), DEFAULT_MAX_DELAY);
        assert_eq!(backoff.jitter(), &Jitter::Fixed);
    }

    #[test]
    fn test_fixed_jitter_adds_a_fifth() {
        let backoff = Backoff::new(3, Duration::from_millis(100));

        assert_eq!(
            backoff.wait_for(Duration::from_millis(100)),
            Duration::from_millis(120)
        );
        assert_eq!(
            backoff.wait_for(Duration::from_millis(200)),
            Duration::from_millis(240)
        );
        assert_eq!(backoff.wait_for(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_next_delay_doubles_then_caps() {
        let backoff = Backoff::new(10, Duration::from_secs(1));

        assert_eq!(
            backoff.next_delay(Duration::from_secs(1)),
            Duration::from_secs(2)
        );
        assert_eq!(
            backoff.next_delay(Duration::from_secs(2)),
            Duration::from_secs(4)
        );
        assert_eq!(
            backoff.next_delay(Duration::from_secs(4)),
            Duration::from_secs(5)
        ); // capped
        assert_eq!(
            backoff.next_delay(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_next_delay_saturates() {
        let backoff = Backoff::new(2, Duration::MAX).with_max_delay(Duration::MAX);
        assert_eq!(backoff.next_delay(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_schedule_length() {
        assert!(Backoff::new(1, Duration::from_millis(10))
            .schedule()
            .is_empty());
        assert!(Backoff::new(0, Duration::from_millis(10))
            .schedule()
            .is_empty());
        assert_eq!(Backoff::new(6, Duration::from_millis(10)).schedule().len(), 5);
    }

    #[test]
    fn test_schedule_with_cap() {
        let schedule = Backoff::new(6, Duration::from_secs(1)).schedule();

        // 1s, 2s, 4s, 5s, 5s plus a fifth
        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(1200),
                Duration::from_millis(2400),
                Duration::from_millis(4800),
                Duration::from_secs(6),
                Duration::from_secs(6),
            ]
        );
    }

    #[test]
    fn test_validate() {
        assert!(Backoff::new(1, Duration::ZERO).validate().is_ok());
        assert_eq!(
            Backoff::new(0, Duration::ZERO).validate(),
            Err(RetryError::InvalidMaxAttempts { max_attempts: 0 })
        );
    }

    #[test]
    fn test_without_jitter() {
        let backoff = Backoff::new(3, Duration::from_millis(100)).without_jitter();
        assert_eq!(backoff.schedule(), vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
        ]);
    }

    #[test]
    fn test_proportional_factor_clamped() {
        let backoff =
            Backoff::new(3, Duration::from_millis(100)).with_jitter(Jitter::Proportional(4.0));
        assert_eq!(backoff.jitter(), &Jitter::Proportional(1.0));
    }

    #[cfg(not(feature = "jitter"))]
    #[test]
    fn test_proportional_without_feature_is_identity() {
        let jitter = Jitter::Proportional(0.5);
        assert_eq!(
            jitter.apply(Duration::from_millis(100)),
            Duration::from_millis(100)
        );
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_stays_in_range() {
        let jitter = Jitter::Proportional(0.25);
        for _ in 0..100 {
            let wait = jitter.apply(Duration::from_millis(100));
            assert!(wait >= Duration::from_millis(75));
            assert!(wait <= Duration::from_millis(125));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_keeps_sub_millisecond_precision() {
        let jitter = Jitter::Proportional(0.1);
        for _ in 0..100 {
            let wait = jitter.apply(Duration::from_micros(1900));
            assert!(wait >= Duration::from_micros(1709), "{:?}", wait);
            assert!(wait <= Duration::from_micros(2091), "{:?}", wait);
        }
    }

    #[test]
    fn test_backoff_is_clone_and_debug() {
        let backoff = Backoff::new(3, Duration::from_millis(100));
        assert_eq!(backoff.clone(), backoff);
        assert!(format!("{:?}", backoff).contains("Backoff"));
    }
}
