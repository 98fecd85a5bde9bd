//! # Faultline
//!
//! Error classification, structured logging and resilient execution for
//! services.
//!
//! Errors travel as [`Report`] chains that carry more than a message:
//! caller locations, hints, details, a [`Domain`](domain::Domain) and
//! classification marks saying whether retrying can help. The logging,
//! retry and panic-recovery helpers all read those annotations.
//!
//! ## Pieces
//!
//! - [`report`]: the error chain and its annotations
//! - [`classify`]: temporary / permanent marks and other sentinels
//! - [`domain`]: domain tagging and exchange error helpers
//! - [`logx`]: leveled JSON logging with rich error fields
//! - [`retry`]: classification-aware retry with exponential backoff
//! - [`recovery`]: panic capture at thread and task boundaries
//! - [`testing`]: capture sink and assertion macros
//!
//! ## Quick Example
//!
//! ```rust
//! use faultline::{classify, domain, kv, logx, Report};
//!
//! fn fetch_price(symbol: &str) -> Result<f64, Report> {
//!     Err(domain::new_exchange_error("RATE_LIMIT", "too many requests", true)
//!         .wrap(format!("failed to fetch {}", symbol)))
//! }
//!
//! let err = fetch_price("BTC/USD").unwrap_err();
//!
//! // Classification survives wrapping.
//! assert!(classify::is_temporary(&err));
//! assert_eq!(domain::get_domain(&err), Some(domain::EXCHANGE));
//!
//! // One record with error, error_verbose, error_source, error_hints,
//! // error_details and error_domain fields.
//! logx::error_err("Price update failed", &err, kv! { "symbol" => "BTC/USD" });
//! ```
//!
//! For runnable programs, see the `demos` directory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod classify;
pub mod domain;
pub mod logx;
pub mod recovery;
pub mod report;
pub mod retry;
pub mod testing;

// Re-exports
pub use classify::Sentinel;
pub use domain::Domain;
pub use logx::{Fields, Level, Logger};
pub use report::{Report, ResultExt};
#[cfg(feature = "async")]
pub use retry::{retry_with_backoff, Retry};
pub use retry::{Backoff, RetryError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classify::{is_permanent, is_temporary, mark_permanent, mark_temporary};
    pub use crate::domain::{get_domain, with_domain, Domain};
    pub use crate::kv;
    pub use crate::logx::{Fields, Level, Logger};
    pub use crate::recovery::{panic_handler, recover, safe_go};
    #[cfg(feature = "async")]
    pub use crate::recovery::safe_spawn;
    pub use crate::report::{Report, ResultExt};
    #[cfg(feature = "async")]
    pub use crate::retry::{retry_with_backoff, Retry};
    pub use crate::retry::{Backoff, RetryError};
}
