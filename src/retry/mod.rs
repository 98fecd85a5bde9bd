//! Classification-aware retry with exponential backoff.
//!
//! The retry driver only retries what is known to be transient:
//!
//! - **Temporary** errors (see [`mark_temporary`](crate::classify::mark_temporary))
//!   are retried until the attempts run out.
//! - **Permanent** and **unclassified** errors are returned unchanged after
//!   the first failure.
//!
//! [`Backoff`] is plain data describing the schedule; [`Retry`] executes it
//! on tokio, racing every wait against a cancellation token.
//!
//! # Quick Start
//!
//! ```rust
//! use faultline::domain::new_exchange_error;
//! use faultline::retry::retry_with_backoff;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let counter = AtomicU32::new(0);
//! let calls = &counter;
//!
//! let price = retry_with_backoff(
//!     || async move {
//!         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
//!             Err(new_exchange_error("NETWORK_ERROR", "connection timeout", true))
//!         } else {
//!             Ok(50_000.0)
//!         }
//!     },
//!     3,
//!     Duration::from_millis(1),
//! )
//! .await
//! .unwrap();
//!
//! assert_eq!(price, 50_000.0);
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # });
//! ```
//!
//! # Schedule
//!
//! The delay starts at the initial delay and doubles after each wait, capped
//! at five seconds by default. Each wait is the delay plus a fifth of it
//! unless another [`Jitter`] is chosen. Enable the `jitter` feature for
//! random proportional jitter:
//!
//! ```toml
//! faultline = { version = "...", features = ["jitter"] }
//! ```
//!
//! # Error Types
//!
//! - [`RetryError`]: invalid configuration, cancellation and per-attempt
//!   timeouts, carried inside a [`Report`](crate::Report)

#[cfg(feature = "async")]
mod driver;
mod error;
mod policy;

#[cfg(feature = "async")]
pub use driver::{retry_with_backoff, Attempt, Retry, RetryEvent};
pub use error::RetryError;
pub use policy::{Backoff, Jitter, DEFAULT_MAX_DELAY};
