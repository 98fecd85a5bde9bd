//! Error domains and the exchange error helpers.
//!
//! A [`Domain`] names the layer an error belongs to (`usecase`, `adapters`,
//! `exchange`, ...) so that logs and HTTP boundaries can route on it. At most
//! one domain is reported per chain: the outermost attachment wins.
//!
//! # Examples
//!
//! ```
//! use faultline::domain::{self, get_domain, with_domain};
//! use faultline::Report;
//!
//! let err = with_domain(Report::msg("database query failed"), domain::ADAPTERS);
//! assert_eq!(get_domain(&err), Some(domain::ADAPTERS));
//! assert_eq!(domain::ADAPTERS.to_string(), "adapters");
//! ```

use std::fmt;

use crate::report::Report;

/// A named error category. Domains compare by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Domain {
    name: &'static str,
}

impl Domain {
    /// Declare a domain.
    pub const fn named(name: &'static str) -> Self {
        Domain { name }
    }

    /// The domain's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Business rules and orchestration.
pub const USECASE: Domain = Domain::named("usecase");

/// Databases, queues and other infrastructure adapters.
pub const ADAPTERS: Domain = Domain::named("adapters");

/// Upstream exchange APIs.
pub const EXCHANGE: Domain = Domain::named("exchange");

/// Attach `domain` to `err`.
#[track_caller]
pub fn with_domain<E>(err: E, domain: Domain) -> Report
where
    Report: From<E>,
{
    Report::from(err).with_domain(domain)
}

/// The outermost domain attached to `err`.
pub fn get_domain(err: &Report) -> Option<Domain> {
    err.domain()
}

/// Wrap `err` with a message and a domain. No stack is recorded, which
/// keeps one boundary per chain.
#[track_caller]
pub fn wrap_with_domain<E>(err: E, message: impl Into<String>, domain: Domain) -> Report
where
    Report: From<E>,
{
    Report::from(err).wrap(message).with_domain(domain)
}

/// Wrap `err` with a message and record a stack boundary.
#[track_caller]
pub fn wrap_with_stack<E>(err: E, message: impl Into<String>) -> Report
where
    Report: From<E>,
{
    Report::from(err).wrap(message).with_stack()
}

/// A failure reported by an exchange API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exchange error [{code}]: {message}")]
pub struct ExchangeError {
    /// Machine-readable error code, e.g. `RATE_LIMIT`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Whether the exchange considers the call retriable.
    pub retry: bool,
}

/// Build a fully annotated exchange error report.
///
/// The report gets one stack boundary, the [`EXCHANGE`] domain, a
/// `code=.. retry=..` detail, a temporary or permanent mark with a matching
/// hint, and the telemetry key `exchange.error.<code>`.
///
/// # Examples
///
/// ```
/// use faultline::domain::{self, is_exchange_code, new_exchange_error};
///
/// let err = new_exchange_error("RATE_LIMIT", "too many requests", true);
/// assert!(err.is_temporary());
/// assert_eq!(err.domain(), Some(domain::EXCHANGE));
/// assert!(is_exchange_code(&err, "RATE_LIMIT"));
/// assert_eq!(err.to_string(), "exchange error [RATE_LIMIT]: too many requests");
/// ```
#[track_caller]
pub fn new_exchange_error(code: &str, message: &str, retry: bool) -> Report {
    let base = ExchangeError {
        code: code.to_string(),
        message: message.to_string(),
        retry,
    };

    let report = Report::new(base)
        .with_stack()
        .with_domain(EXCHANGE)
        .with_detail(format!("code={} retry={}", code, retry));

    let report = if retry {
        report
            .mark_temporary()
            .with_hint("This error is temporary and can be retried")
    } else {
        report
            .mark_permanent()
            .with_hint("This error is permanent and should not be retried")
    };

    report.with_telemetry(format!("exchange.error.{}", code))
}

/// Whether `err` holds an [`ExchangeError`] with the given code.
pub fn is_exchange_code(err: &Report, code: &str) -> bool {
    err.find::<ExchangeError>()
        .is_some_and(|exchange| exchange.code == code)
}
