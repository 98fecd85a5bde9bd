//! Error types for retry operations.

use std::time::Duration;

/// Failures produced by the retry driver itself.
///
/// The driver returns these inside a [`Report`](crate::Report); recover the
/// variant with [`Report::find`](crate::Report::find).
///
/// # Examples
///
/// ```rust
/// use faultline::retry::{retry_with_backoff, RetryError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let result = retry_with_backoff(|| async { Ok(()) }, 0, Duration::from_millis(1)).await;
///
/// let err = result.unwrap_err();
/// assert_eq!(
///     err.find::<RetryError>(),
///     Some(&RetryError::InvalidMaxAttempts { max_attempts: 0 })
/// );
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// The configuration allows no attempt at all.
    #[error("invalid retry configuration: max_attempts must be at least 1, got {max_attempts}")]
    InvalidMaxAttempts {
        /// The rejected value.
        max_attempts: u32,
    },
    /// The cancellation token fired while waiting to retry.
    #[error("retry cancelled after attempt {attempt}")]
    Cancelled {
        /// The last attempt that ran.
        attempt: u32,
    },
    /// A single attempt ran longer than the per-attempt timeout.
    #[error("attempt {attempt} timed out after {timeout:?}")]
    AttemptTimedOut {
        /// The attempt that timed out.
        attempt: u32,
        /// The configured per-attempt timeout.
        timeout: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            RetryError::InvalidMaxAttempts { max_attempts: 0 }.to_string(),
            "invalid retry configuration: max_attempts must be at least 1, got 0"
        );
        assert_eq!(
            RetryError::Cancelled { attempt: 2 }.to_string(),
            "retry cancelled after attempt 2"
        );
        assert_eq!(
            RetryError::AttemptTimedOut {
                attempt: 1,
                timeout: Duration::from_millis(50)
            }
            .to_string(),
            "attempt 1 timed out after 50ms"
        );
    }
}
