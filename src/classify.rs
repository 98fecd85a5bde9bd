//! Retry classification through sentinel marks.
//!
//! A report is *temporary* (safe to retry), *permanent* (retrying is
//! pointless) or neither. The classification is carried as a mark layer that
//! associates the report with a well-known [`Sentinel`], independent of the
//! report's message or typed root.
//!
//! Unmarked reports are their own state: [`is_temporary`] and
//! [`is_permanent`] both return `false`, and the retry driver treats them as
//! not retriable. A report marked both ways answers `true` to both queries;
//! any mark found in the chain counts.
//!
//! # Examples
//!
//! ```
//! use faultline::classify::{is_permanent, is_temporary, mark_temporary};
//! use faultline::Report;
//!
//! let err = mark_temporary(Report::msg("connection pool exhausted"));
//! assert!(is_temporary(&err));
//! assert!(!is_permanent(&err));
//!
//! let unmarked = Report::msg("unexpected state");
//! assert!(!is_temporary(&unmarked));
//! assert!(!is_permanent(&unmarked));
//! ```

use std::fmt;

use crate::report::Report;

/// A named, well-known error value used as an association target.
///
/// Sentinels compare by name. They implement [`std::error::Error`], so a
/// sentinel can also be the root of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sentinel {
    name: &'static str,
}

impl Sentinel {
    /// Declare a sentinel.
    pub const fn new(name: &'static str) -> Self {
        Sentinel { name }
    }

    /// The sentinel's name, which is also its message.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl std::error::Error for Sentinel {}

/// The error can be retried.
pub const TEMPORARY: Sentinel = Sentinel::new("temporary error");

/// The error should not be retried.
pub const PERMANENT: Sentinel = Sentinel::new("permanent error");

/// A resource was not found.
pub const NOT_FOUND: Sentinel = Sentinel::new("not found");

/// An operation timed out.
pub const TIMEOUT: Sentinel = Sentinel::new("timeout");

/// The caller was rate limited.
pub const RATE_LIMITED: Sentinel = Sentinel::new("rate limited");

/// Associate `err` with `sentinel`.
#[track_caller]
pub fn mark<E>(err: E, sentinel: Sentinel) -> Report
where
    Report: From<E>,
{
    Report::from(err).mark(sentinel)
}

/// Whether `err` is associated with `sentinel`.
pub fn is(err: &Report, sentinel: Sentinel) -> bool {
    err.is(sentinel)
}

/// Mark `err` as temporary/retriable.
#[track_caller]
pub fn mark_temporary<E>(err: E) -> Report
where
    Report: From<E>,
{
    mark(err, TEMPORARY)
}

/// Whether `err` carries the temporary mark.
pub fn is_temporary(err: &Report) -> bool {
    err.is(TEMPORARY)
}

/// Mark `err` as permanent.
#[track_caller]
pub fn mark_permanent<E>(err: E) -> Report
where
    Report: From<E>,
{
    mark(err, PERMANENT)
}

/// Whether `err` carries the permanent mark.
pub fn is_permanent(err: &Report) -> bool {
    err.is(PERMANENT)
}
