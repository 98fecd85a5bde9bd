//! The async retry loop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::RetryError;
use super::policy::Backoff;
use crate::classify::TIMEOUT;
use crate::kv;
use crate::logx::{self, Logger};
use crate::report::Report;

/// Which attempt an operation is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Total attempts allowed.
    pub max_attempts: u32,
}

impl Attempt {
    /// Whether this is the final allowed attempt.
    pub fn is_last(&self) -> bool {
        self.number >= self.max_attempts
    }
}

/// Information about a failed attempt that is about to be retried.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a Report,
    /// Time that will be waited before the next attempt.
    pub next_delay: Duration,
    /// Total elapsed time since the first attempt started.
    pub elapsed: Duration,
}

type RetryHook = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Runs an operation until it succeeds, fails permanently or runs out of
/// attempts.
///
/// Only errors classified as temporary are retried. Permanent and
/// unclassified errors are logged and returned unchanged after the first
/// failure. When every attempt fails with a temporary error the last error
/// is wrapped with `operation failed after N attempts`.
///
/// # Examples
///
/// ```rust
/// use faultline::retry::{Backoff, Retry};
/// use faultline::Report;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let retry = Retry::new(Backoff::new(3, Duration::from_millis(1)));
///
/// let value = retry
///     .run(|attempt| async move {
///         if attempt.number < 2 {
///             Err(Report::msg("connection reset").mark_temporary())
///         } else {
///             Ok(attempt.number)
///         }
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(value, 2);
/// # });
/// ```
#[derive(Clone)]
pub struct Retry {
    backoff: Backoff,
    cancel: CancellationToken,
    attempt_timeout: Option<Duration>,
    logger: Option<Arc<Logger>>,
    on_retry: Option<RetryHook>,
}

impl Retry {
    /// A driver following `backoff`, logging to the process-wide logger.
    pub fn new(backoff: Backoff) -> Self {
        Retry {
            backoff,
            cancel: CancellationToken::new(),
            attempt_timeout: None,
            logger: None,
            on_retry: None,
        }
    }

    /// Abort the backoff wait when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fail an attempt that runs longer than `timeout`.
    ///
    /// A timed-out attempt counts as a temporary failure and is retried.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Log to `logger` instead of the process-wide logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Call `hook` after every failed attempt that will be retried, before
    /// the wait.
    ///
    /// ```rust
    /// use faultline::retry::{Backoff, Retry, RetryEvent};
    /// use faultline::Report;
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let retry = Retry::new(Backoff::new(3, Duration::from_millis(1))).on_retry({
    ///     let seen = seen.clone();
    ///     move |event: &RetryEvent<'_>| seen.lock().unwrap().push(event.attempt)
    /// });
    ///
    /// let _ = retry
    ///     .run(|_| async { Err::<(), _>(Report::msg("busy").mark_temporary()) })
    ///     .await;
    ///
    /// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    /// # });
    /// ```
    pub fn on_retry<H>(mut self, hook: H) -> Self
    where
        H: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    /// The backoff configuration.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `operation` with retries.
    ///
    /// `operation` is called once per attempt and receives the attempt
    /// number, so each call can build a fresh request.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, Report>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, Report>>,
    {
        self.backoff.validate().map_err(Report::new)?;

        let logger = self.logger.clone().unwrap_or_else(logx::logger);
        let max_attempts = self.backoff.max_attempts();
        let start = Instant::now();
        let mut delay = self.backoff.initial_delay();
        let mut number = 0;

        loop {
            number += 1;
            let attempt = Attempt {
                number,
                max_attempts,
            };

            let err = match self.attempt(&mut operation, attempt).await {
                Ok(value) => {
                    if number > 1 {
                        logger.info(
                            "Operation succeeded after retry",
                            kv! { "attempt" => number, "max_retries" => max_attempts },
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_temporary() {
                logger.error_err(
                    "Operation failed with permanent error",
                    &err,
                    kv! { "attempt" => number, "retry" => false },
                );
                return Err(err);
            }

            if attempt.is_last() {
                logger.error_err(
                    "Operation failed after max retries",
                    &err,
                    kv! { "attempt" => number, "max_retries" => max_attempts },
                );
                return Err(err.wrap(format!("operation failed after {} attempts", max_attempts)));
            }

            let wait = self.backoff.wait_for(delay);
            logger.warn_err(
                "Operation failed with temporary error, retrying",
                &err,
                kv! {
                    "attempt" => number,
                    "max_retries" => max_attempts,
                    "retry_delay" => format!("{:?}", delay),
                },
            );
            if let Some(hook) = &self.on_retry {
                hook(&RetryEvent {
                    attempt: number,
                    error: &err,
                    next_delay: wait,
                    elapsed: start.elapsed(),
                });
            }

            tokio::select! { biased;
                _ = self.cancel.cancelled() => {
                    logger.warn("Retry cancelled", kv! { "attempt" => number });
                    return Err(Report::new(RetryError::Cancelled { attempt: number })
                        .with_detail(format!("last error: {}", err)));
                }
                _ = tokio::time::sleep(wait) => {}
            }

            delay = self.backoff.next_delay(delay);
        }
    }

    async fn attempt<T, F, Fut>(&self, operation: &mut F, attempt: Attempt) -> Result<T, Report>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, Report>>,
    {
        let Some(timeout) = self.attempt_timeout else {
            return operation(attempt).await;
        };

        match tokio::time::timeout(timeout, operation(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(Report::new(RetryError::AttemptTimedOut {
                attempt: attempt.number,
                timeout,
            })
            .mark(TIMEOUT)
            .mark_temporary()),
        }
    }
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("backoff", &self.backoff)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("attempt_timeout", &self.attempt_timeout)
            .field("logger", &self.logger)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

/// Retry `operation` up to `max_attempts` times, starting with
/// `initial_delay` between attempts.
///
/// Shorthand for [`Retry::new`] with a default [`Backoff`], logging to the
/// process-wide logger.
///
/// # Examples
///
/// ```rust
/// use faultline::domain::new_exchange_error;
/// use faultline::retry::retry_with_backoff;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// // Permanent errors are returned after a single attempt.
/// let result = retry_with_backoff(
///     || async { Err::<(), _>(new_exchange_error("INVALID_SYMBOL", "symbol not found", false)) },
///     3,
///     Duration::from_millis(100),
/// )
/// .await;
///
/// assert!(result.unwrap_err().is_permanent());
/// # });
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    initial_delay: Duration,
) -> Result<T, Report>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Report>>,
{
    Retry::new(Backoff::new(max_attempts, initial_delay))
        .run(|_| operation())
        .await
}
