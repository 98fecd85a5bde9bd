//! Testing utilities for code that logs and classifies errors.
//!
//! This module provides an in-memory log sink for asserting on emitted
//! records, assertion macros for classification and domains, and (with the
//! `proptest` feature) a strategy producing arbitrary report chains.
//!
//! # Examples
//!
//! ## Capturing log output
//!
//! ```rust
//! use faultline::kv;
//! use faultline::logx::Level;
//! use faultline::testing::CaptureSink;
//!
//! let sink = CaptureSink::new();
//! let logger = sink.logger(Level::Debug);
//!
//! logger.warn("disk almost full", kv! { "free_mb" => 120 });
//!
//! let record = sink.find("disk almost full").unwrap();
//! assert_eq!(record["level"], "WARN");
//! assert_eq!(record["free_mb"], 120);
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use faultline::{assert_domain, assert_permanent, assert_temporary, domain, Report};
//!
//! let err = Report::msg("connection reset").mark_temporary();
//! assert_temporary!(err);
//!
//! let err = Report::msg("bad input").mark_permanent().with_domain(domain::USECASE);
//! assert_permanent!(err);
//! assert_domain!(err, domain::USECASE);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::logx::{Level, Logger, Sink};

/// A sink that keeps every record in memory.
///
/// Clones share the same buffer, so keep one clone for assertions and give
/// another to the logger.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A logger at `level` writing into this sink.
    pub fn logger(&self, level: Level) -> Logger {
        Logger::new(level, self.clone())
    }

    /// The raw JSON lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every record parsed as JSON, oldest first.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// The first record whose `msg` equals `msg`.
    pub fn find(&self, msg: &str) -> Option<Value> {
        self.records().into_iter().find(|record| record["msg"] == msg)
    }

    /// Every record whose `msg` equals `msg`.
    pub fn find_all(&self, msg: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["msg"] == msg)
            .collect()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<Value> {
        self.records().pop()
    }

    /// Number of records captured.
    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every captured record.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for CaptureSink {
    fn write_record(&self, _level: Level, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Assert that a report is classified as temporary.
///
/// # Example
///
/// ```rust
/// use faultline::{assert_temporary, Report};
///
/// let err = Report::msg("timeout").mark_temporary();
/// assert_temporary!(err);
/// ```
#[macro_export]
macro_rules! assert_temporary {
    ($report:expr) => {
        match &$report {
            report if $crate::classify::is_temporary(report) => {}
            report => {
                panic!("Expected temporary error, got: {:#}", report);
            }
        }
    };
}

/// Assert that a report is classified as permanent.
///
/// # Example
///
/// ```rust
/// use faultline::{assert_permanent, Report};
///
/// let err = Report::msg("invalid symbol").mark_permanent();
/// assert_permanent!(err);
/// ```
#[macro_export]
macro_rules! assert_permanent {
    ($report:expr) => {
        match &$report {
            report if $crate::classify::is_permanent(report) => {}
            report => {
                panic!("Expected permanent error, got: {:#}", report);
            }
        }
    };
}

/// Assert that a report carries the given domain.
///
/// # Example
///
/// ```rust
/// use faultline::{assert_domain, domain, Report};
///
/// let err = Report::msg("query failed").with_domain(domain::ADAPTERS);
/// assert_domain!(err, domain::ADAPTERS);
/// ```
#[macro_export]
macro_rules! assert_domain {
    ($report:expr, $domain:expr) => {
        match $crate::domain::get_domain(&$report) {
            Some(found) if found == $domain => {}
            other => {
                panic!("Expected domain {}, got {:?}", $domain, other);
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
#[derive(Debug, Clone)]
enum LayerOp {
    Wrap(String),
    Hint(String),
    Detail(String),
    Domain,
    Stack,
}

/// A strategy producing report chains of up to eight annotation layers
/// over a random root message.
#[cfg(feature = "proptest")]
pub fn arb_report() -> impl Strategy<Value = crate::Report> {
    use crate::domain;
    use crate::Report;

    let layer = prop_oneof![
        "[a-z ]{1,12}".prop_map(LayerOp::Wrap),
        "[a-z ]{1,12}".prop_map(LayerOp::Hint),
        "[a-z=0-9]{1,12}".prop_map(LayerOp::Detail),
        Just(LayerOp::Domain),
        Just(LayerOp::Stack),
    ];

    ("[a-z ]{1,16}", prop::collection::vec(layer, 0..8)).prop_map(|(root, layers)| {
        layers
            .into_iter()
            .fold(Report::msg(root), |report, layer| match layer {
                LayerOp::Wrap(msg) => report.wrap(msg),
                LayerOp::Hint(hint) => report.with_hint(hint),
                LayerOp::Detail(detail) => report.with_detail(detail),
                LayerOp::Domain => report.with_domain(domain::ADAPTERS),
                LayerOp::Stack => report.with_stack(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain;
    use crate::kv;
    use crate::Report;

    #[test]
    fn capture_sink_collects_records() {
        let sink = CaptureSink::new();
        let logger = sink.logger(Level::Info);

        logger.info("first", kv! {});
        logger.error("second", kv! { "code" => 7 });

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[0]["msg"], "first");
        assert_eq!(sink.last().unwrap()["code"], 7);
        assert_eq!(sink.find_all("second").len(), 1);
        assert!(sink.find("third").is_none());
    }

    #[test]
    fn capture_sink_clear() {
        let sink = CaptureSink::new();
        sink.logger(Level::Info).info("x", kv! {});
        sink.clear();
        assert!(sink.is_empty());
        assert!(sink.last().is_none());
    }

    #[test]
    fn capture_sink_clones_share_buffer() {
        let sink = CaptureSink::new();
        let other = sink.clone();
        other.write_record(Level::Warn, r#"{"msg":"shared"}"#);
        assert_eq!(sink.lines(), vec![r#"{"msg":"shared"}"#.to_string()]);
    }

    #[test]
    fn assert_temporary_macro() {
        let err = Report::msg("timeout").mark_temporary();
        assert_temporary!(err);
    }

    #[test]
    fn assert_permanent_macro() {
        let err = Report::msg("invalid").mark_permanent();
        assert_permanent!(err);
    }

    #[test]
    fn assert_domain_macro() {
        let err = Report::msg("query failed").with_domain(domain::ADAPTERS);
        assert_domain!(err, domain::ADAPTERS);
    }

    #[test]
    #[should_panic(expected = "Expected temporary error")]
    fn assert_temporary_panics_on_unclassified() {
        let err = Report::msg("plain");
        assert_temporary!(err);
    }

    #[test]
    #[should_panic(expected = "Expected permanent error")]
    fn assert_permanent_panics_on_temporary() {
        let err = Report::msg("timeout").mark_temporary();
        assert_permanent!(err);
    }

    #[test]
    #[should_panic(expected = "Expected domain usecase")]
    fn assert_domain_panics_on_mismatch() {
        let err = Report::msg("query failed").with_domain(domain::ADAPTERS);
        assert_domain!(err, domain::USECASE);
    }

    #[cfg(feature = "proptest")]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arb_report_renders_root_last(report in arb_report()) {
                let messages = report.messages();
                prop_assert!(!messages.is_empty());
                prop_assert!(report.to_string().ends_with(messages[messages.len() - 1]));
            }
        }
    }
}
