//! Error reports with an annotated cause chain
//!
//! This module provides the `Report` type, an immutable error value that
//! accumulates annotations as it propagates up the call stack: wrapping
//! messages, hints for the operator, structured details, a domain, retry
//! classification marks, telemetry keys and the source location where each
//! boundary was crossed.
//!
//! Every annotation creates a new node pointing at the previous one. Nodes are
//! shared behind an `Arc`, so cloning a report is cheap and wrapping never
//! mutates the report being wrapped.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use faultline::Report;
//!
//! let err = Report::msg("connection timeout")
//!     .with_hint("Check if the database is accessible")
//!     .wrap("database connection failed");
//!
//! assert_eq!(err.to_string(), "database connection failed: connection timeout");
//! assert_eq!(err.hints(), vec!["Check if the database is accessible"]);
//! assert!(err.source_location().is_some());
//! ```
//!
//! ## Converting standard errors
//!
//! ```
//! use faultline::{Report, ResultExt};
//!
//! fn parse_port(raw: &str) -> Result<u16, Report> {
//!     raw.parse::<u16>().wrap_err("invalid port")
//! }
//!
//! let err = parse_port("http").unwrap_err();
//! assert!(err.to_string().starts_with("invalid port: "));
//! assert!(err.find::<std::num::ParseIntError>().is_some());
//! ```

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::classify::{Sentinel, PERMANENT, TEMPORARY};
use crate::domain::Domain;

type DynError = dyn StdError + Send + Sync + 'static;

/// An immutable error chain node.
///
/// A `Report` is exactly one annotation layer plus an optional cause. The
/// root of every chain carries the original message (and optionally the
/// typed error it was built from); every other layer decorates its cause.
///
/// `Report` deliberately does not implement [`std::error::Error`], which lets
/// any error type convert into it with `?`.
#[derive(Clone)]
pub struct Report {
    node: Arc<Node>,
}

struct Node {
    layer: Layer,
    cause: Option<Report>,
}

enum Layer {
    Root {
        message: String,
        error: Option<Box<DynError>>,
        location: &'static Location<'static>,
    },
    Wrap {
        message: String,
        location: &'static Location<'static>,
    },
    Stack {
        location: &'static Location<'static>,
        backtrace: Backtrace,
    },
    Hint(String),
    Detail(String),
    Domain(Domain),
    Mark(Sentinel),
    Telemetry(String),
}

impl Report {
    /// Create a report from a plain message.
    ///
    /// The caller's source location is captured.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::Report;
    ///
    /// let err = Report::msg("insufficient balance");
    /// assert_eq!(err.to_string(), "insufficient balance");
    /// ```
    #[track_caller]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::root(message.into(), None, Location::caller())
    }

    /// Create a report from a typed error.
    ///
    /// The error stays reachable through [`Report::find`].
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::Report;
    /// use std::io;
    ///
    /// let err = Report::new(io::Error::new(io::ErrorKind::NotFound, "config.toml"));
    /// assert_eq!(err.find::<io::Error>().unwrap().kind(), io::ErrorKind::NotFound);
    /// ```
    #[track_caller]
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::root(error.to_string(), Some(Box::new(error)), Location::caller())
    }

    fn root(
        message: String,
        error: Option<Box<DynError>>,
        location: &'static Location<'static>,
    ) -> Self {
        Report {
            node: Arc::new(Node {
                layer: Layer::Root {
                    message,
                    error,
                    location,
                },
                cause: None,
            }),
        }
    }

    fn layered(self, layer: Layer) -> Self {
        Report {
            node: Arc::new(Node {
                layer,
                cause: Some(self),
            }),
        }
    }

    /// Wrap this report with a higher-level message.
    ///
    /// The rendered message becomes `"message: cause"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::Report;
    ///
    /// let err = Report::msg("insufficient balance").wrap("payment processing failed");
    /// assert_eq!(err.to_string(), "payment processing failed: insufficient balance");
    /// assert_eq!(err.messages(), vec!["payment processing failed", "insufficient balance"]);
    /// ```
    #[track_caller]
    pub fn wrap(self, message: impl Into<String>) -> Self {
        let location = Location::caller();
        self.layered(Layer::Wrap {
            message: message.into(),
            location,
        })
    }

    /// Record a boundary: the caller location and a backtrace.
    ///
    /// The backtrace honors `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`; when
    /// disabled only the location is kept.
    #[track_caller]
    pub fn with_stack(self) -> Self {
        let location = Location::caller();
        self.layered(Layer::Stack {
            location,
            backtrace: Backtrace::capture(),
        })
    }

    /// Attach a hint for whoever has to act on the error.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        self.layered(Layer::Hint(hint.into()))
    }

    /// Attach a structured detail, typically `key=value` text.
    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        self.layered(Layer::Detail(detail.into()))
    }

    /// Attach a domain. The outermost domain wins on lookup.
    pub fn with_domain(self, domain: Domain) -> Self {
        self.layered(Layer::Domain(domain))
    }

    /// Associate this report with a sentinel.
    pub fn mark(self, sentinel: Sentinel) -> Self {
        self.layered(Layer::Mark(sentinel))
    }

    /// Mark this report as safe to retry.
    pub fn mark_temporary(self) -> Self {
        self.mark(TEMPORARY)
    }

    /// Mark this report as not worth retrying.
    pub fn mark_permanent(self) -> Self {
        self.mark(PERMANENT)
    }

    /// Attach a telemetry key, e.g. a metric name for this failure.
    pub fn with_telemetry(self, key: impl Into<String>) -> Self {
        self.layered(Layer::Telemetry(key.into()))
    }

    /// The wrapped predecessor, if any.
    pub fn cause(&self) -> Option<&Report> {
        self.node.cause.as_ref()
    }

    fn nodes(&self) -> Nodes<'_> {
        Nodes { next: Some(self) }
    }

    /// Message layers, outermost first.
    pub fn messages(&self) -> Vec<&str> {
        self.nodes()
            .filter_map(|node| match &node.layer {
                Layer::Root { message, .. } | Layer::Wrap { message, .. } => {
                    Some(message.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// All hints, innermost first.
    pub fn hints(&self) -> Vec<&str> {
        self.collect_inner_first(|layer| match layer {
            Layer::Hint(hint) => Some(hint.as_str()),
            _ => None,
        })
    }

    /// All details, innermost first.
    pub fn details(&self) -> Vec<&str> {
        self.collect_inner_first(|layer| match layer {
            Layer::Detail(detail) => Some(detail.as_str()),
            _ => None,
        })
    }

    /// All telemetry keys, innermost first.
    pub fn telemetry_keys(&self) -> Vec<&str> {
        self.collect_inner_first(|layer| match layer {
            Layer::Telemetry(key) => Some(key.as_str()),
            _ => None,
        })
    }

    fn collect_inner_first<'a, F>(&'a self, pick: F) -> Vec<&'a str>
    where
        F: Fn(&'a Layer) -> Option<&'a str>,
    {
        let mut found: Vec<&str> = self.nodes().filter_map(|node| pick(&node.layer)).collect();
        found.reverse();
        found
    }

    /// The outermost attached domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::{domain, Report};
    ///
    /// let err = Report::msg("query failed")
    ///     .with_domain(domain::ADAPTERS)
    ///     .wrap("failed to update price")
    ///     .with_domain(domain::USECASE);
    ///
    /// assert_eq!(err.domain(), Some(domain::USECASE));
    /// ```
    pub fn domain(&self) -> Option<Domain> {
        self.nodes().find_map(|node| match node.layer {
            Layer::Domain(domain) => Some(domain),
            _ => None,
        })
    }

    /// Whether the chain is associated with `sentinel`.
    ///
    /// True when a mark for the sentinel was attached anywhere in the chain,
    /// or when the chain was built from the sentinel itself.
    pub fn is(&self, sentinel: Sentinel) -> bool {
        let marked = self
            .nodes()
            .any(|node| matches!(node.layer, Layer::Mark(mark) if mark == sentinel));
        marked || self.find::<Sentinel>() == Some(&sentinel)
    }

    /// Whether the chain carries the temporary mark.
    pub fn is_temporary(&self) -> bool {
        self.is(TEMPORARY)
    }

    /// Whether the chain carries the permanent mark.
    pub fn is_permanent(&self) -> bool {
        self.is(PERMANENT)
    }

    /// The innermost captured source location.
    pub fn source_location(&self) -> Option<&'static Location<'static>> {
        self.nodes()
            .filter_map(|node| node.layer.location())
            .last()
    }

    /// Find the first typed error of type `T` in the chain.
    ///
    /// Looks at the typed root error and everything reachable through its
    /// [`std::error::Error::source`] chain.
    pub fn find<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        self.nodes().find_map(|node| {
            let Layer::Root {
                error: Some(error), ..
            } = &node.layer
            else {
                return None;
            };
            let root: &(dyn StdError + 'static) = &**error;
            let mut current = Some(root);
            while let Some(err) = current {
                if let Some(found) = err.downcast_ref::<T>() {
                    return Some(found);
                }
                current = err.source();
            }
            None
        })
    }

    /// Multi-line rendering: the message, then one line per layer with its
    /// location, then any captured backtrace.
    ///
    /// Same as formatting with `{:#}`.
    pub fn verbose(&self) -> String {
        format!("{:#}", self)
    }

    fn write_verbose(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_messages(f)?;
        for (index, node) in self.nodes().enumerate() {
            write!(f, "\n({}) ", index + 1)?;
            match &node.layer {
                Layer::Root { message, error, .. } => {
                    write!(f, "{}", message)?;
                    if let Some(error) = error {
                        let mut source = error.source();
                        while let Some(inner) = source {
                            write!(f, "\n  | caused by: {}", inner)?;
                            source = inner.source();
                        }
                    }
                }
                Layer::Wrap { message, .. } => write!(f, "{}", message)?,
                Layer::Stack { .. } => write!(f, "stack boundary")?,
                Layer::Hint(hint) => write!(f, "hint: {}", hint)?,
                Layer::Detail(detail) => write!(f, "detail: {}", detail)?,
                Layer::Domain(domain) => write!(f, "domain: {}", domain)?,
                Layer::Mark(sentinel) => write!(f, "mark: {}", sentinel)?,
                Layer::Telemetry(key) => write!(f, "telemetry: {}", key)?,
            }
            if let Some(location) = node.layer.location() {
                write!(f, "\n  | at {}", location)?;
            }
        }
        for node in self.nodes() {
            if let Layer::Stack { backtrace, .. } = &node.layer {
                if backtrace.status() == BacktraceStatus::Captured {
                    write!(f, "\nbacktrace:\n{}", backtrace)?;
                }
            }
        }
        Ok(())
    }

    fn write_messages(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, message) in self.messages().into_iter().enumerate() {
            if index > 0 {
                f.write_str(": ")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

impl Layer {
    fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Layer::Root { location, .. }
            | Layer::Wrap { location, .. }
            | Layer::Stack { location, .. } => Some(*location),
            _ => None,
        }
    }
}

struct Nodes<'a> {
    next: Option<&'a Report>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let report = self.next?;
        self.next = report.node.cause.as_ref();
        Some(&report.node)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            self.write_verbose(f)
        } else {
            self.write_messages(f)
        }
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_verbose(f)
    }
}

impl<E> From<E> for Report
where
    E: StdError + Send + Sync + 'static,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Report::new(error)
    }
}

/// Annotate the error side of a `Result` without unwrapping it.
///
/// Implemented for every `Result<T, E>` whose error converts into a
/// [`Report`], including `Result<T, Report>` itself.
///
/// # Examples
///
/// ```
/// use faultline::{domain, Report, ResultExt};
///
/// fn load() -> Result<(), Report> {
///     Err(Report::msg("pool exhausted"))
///         .mark_temporary()
///         .with_domain(domain::ADAPTERS)
///         .wrap_err("failed to persist price")
/// }
///
/// let err = load().unwrap_err();
/// assert!(err.is_temporary());
/// assert_eq!(err.domain(), Some(domain::ADAPTERS));
/// ```
pub trait ResultExt<T> {
    /// Wrap the error with a message.
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Report>;

    /// Attach a hint to the error.
    fn with_hint(self, hint: impl Into<String>) -> Result<T, Report>;

    /// Attach a domain to the error.
    fn with_domain(self, domain: Domain) -> Result<T, Report>;

    /// Mark the error as temporary.
    fn mark_temporary(self) -> Result<T, Report>;

    /// Mark the error as permanent.
    fn mark_permanent(self) -> Result<T, Report>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    Report: From<E>,
{
    #[track_caller]
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Report> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Report::from(err).wrap(message)),
        }
    }

    #[track_caller]
    fn with_hint(self, hint: impl Into<String>) -> Result<T, Report> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Report::from(err).with_hint(hint)),
        }
    }

    #[track_caller]
    fn with_domain(self, domain: Domain) -> Result<T, Report> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Report::from(err).with_domain(domain)),
        }
    }

    #[track_caller]
    fn mark_temporary(self) -> Result<T, Report> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Report::from(err).mark_temporary()),
        }
    }

    #[track_caller]
    fn mark_permanent(self) -> Result<T, Report> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Report::from(err).mark_permanent()),
        }
    }
}
