//! The logger value and record rendering.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::fields::Fields;
use super::level::Level;
use super::sink::{Sink, WriterSink};
use crate::report::Report;

/// A leveled, structured JSON logger.
///
/// A `Logger` is an immutable value: a minimum level, a sink and a set of
/// fields bound to every record. Deriving a child logger or changing the
/// level produces a new value sharing the same sink.
///
/// # Examples
///
/// ```
/// use faultline::kv;
/// use faultline::logx::{Level, Logger};
/// use faultline::testing::CaptureSink;
///
/// let sink = CaptureSink::new();
/// let logger = Logger::new(Level::Info, sink.clone()).with_component("billing");
///
/// logger.debug("hidden", kv! {});
/// logger.info("charged", kv! { "amount" => 500 });
///
/// let records = sink.records();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0]["msg"], "charged");
/// assert_eq!(records[0]["component"], "billing");
/// assert_eq!(records[0]["amount"], 500);
/// ```
#[derive(Clone)]
pub struct Logger {
    level: Level,
    sink: Arc<dyn Sink>,
    fields: Fields,
}

impl Logger {
    /// Create a logger writing to `sink`.
    pub fn new(level: Level, sink: impl Sink + 'static) -> Self {
        Logger {
            level,
            sink: Arc::new(sink),
            fields: Fields::new(),
        }
    }

    /// Create a logger writing to standard output.
    pub fn stdout(level: Level) -> Self {
        Self::new(level, WriterSink::new(io::stdout()))
    }

    /// The minimum level this logger emits.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Fields bound to every record.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Same sink and fields, different level.
    pub fn with_level(&self, level: Level) -> Self {
        Logger {
            level,
            ..self.clone()
        }
    }

    /// A child logger that adds `fields` to every record.
    pub fn with(&self, fields: Fields) -> Self {
        let mut child = self.clone();
        child.fields.extend(fields);
        child
    }

    /// A child logger tagged with `component`.
    pub fn with_component(&self, component: &str) -> Self {
        self.with(Fields::new().with("component", component))
    }

    /// A child logger tagged with `request_id`.
    pub fn with_request_id(&self, request_id: &str) -> Self {
        self.with(Fields::new().with("request_id", request_id))
    }

    /// Whether records at `level` are emitted.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Emit a record.
    ///
    /// A bound or call field whose key is already in the record (`time`,
    /// `level`, `msg` or an earlier field) is written as `fields.<key>`.
    ///
    /// ```
    /// use faultline::kv;
    /// use faultline::logx::{Level, Logger};
    /// use faultline::testing::CaptureSink;
    ///
    /// let sink = CaptureSink::new();
    /// let logger = Logger::new(Level::Info, sink.clone());
    /// logger.info("real message", kv! { "msg" => "caller value" });
    ///
    /// let record = sink.last().unwrap();
    /// assert_eq!(record["msg"], "real message");
    /// assert_eq!(record["fields.msg"], "caller value");
    /// ```
    pub fn log(&self, level: Level, msg: &str, fields: Fields) {
        self.emit(level, msg, &Fields::new(), &fields);
    }

    fn emit(&self, level: Level, msg: &str, error: &Fields, fields: &Fields) {
        if !self.enabled(level) {
            return;
        }

        let record = Record {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            msg,
            bound: &self.fields,
            error,
            fields,
        };
        let line = serde_json::to_string(&record).unwrap_or_else(|err| {
            serde_json::json!({
                "time": record.time,
                "level": level.as_str(),
                "msg": msg,
                "log_error": err.to_string(),
            })
            .to_string()
        });
        self.sink.write_record(level, &line);
    }

    /// Emit a debug record.
    pub fn debug(&self, msg: &str, fields: Fields) {
        self.log(Level::Debug, msg, fields);
    }

    /// Emit an info record.
    pub fn info(&self, msg: &str, fields: Fields) {
        self.log(Level::Info, msg, fields);
    }

    /// Emit a warn record.
    pub fn warn(&self, msg: &str, fields: Fields) {
        self.log(Level::Warn, msg, fields);
    }

    /// Emit an error record.
    pub fn error(&self, msg: &str, fields: Fields) {
        self.log(Level::Error, msg, fields);
    }

    /// Emit an error record enriched from `err`.
    ///
    /// Adds `error`, `error_verbose`, `error_source`, `error_hints`,
    /// `error_details` and `error_domain` (the last four only when present)
    /// ahead of `fields`. These keys are reserved like `msg`: a bound or
    /// call field using one is renamed `fields.<key>`. Without an error
    /// this is plain [`Logger::error`].
    ///
    /// `error_source` is the innermost captured location rendered as
    /// `file:line:column`. Function names are not available from
    /// [`std::panic::Location`], so it never reads `file:line in fn`.
    pub fn error_err<'a>(&self, msg: &str, err: impl Into<Option<&'a Report>>, fields: Fields) {
        match err.into() {
            Some(err) => self.emit(Level::Error, msg, &error_fields(err), &fields),
            None => self.error(msg, fields),
        }
    }

    /// Emit a warn record with the error message and source location.
    pub fn warn_err<'a>(&self, msg: &str, err: impl Into<Option<&'a Report>>, fields: Fields) {
        match err.into() {
            Some(err) => self.emit(Level::Warn, msg, &warn_fields(err), &fields),
            None => self.warn(msg, fields),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// The rich fields [`Logger::error_err`] extracts from a report.
pub fn error_fields(err: &Report) -> Fields {
    let mut fields = Fields::new()
        .with("error", err.to_string())
        .with("error_verbose", err.verbose());

    if let Some(location) = err.source_location() {
        fields.insert("error_source", location.to_string());
    }
    let hints = err.hints();
    if !hints.is_empty() {
        fields.insert("error_hints", hints);
    }
    let details = err.details();
    if !details.is_empty() {
        fields.insert("error_details", details);
    }
    if let Some(domain) = err.domain() {
        fields.insert("error_domain", domain.name());
    }
    fields
}

/// The fields [`Logger::warn_err`] extracts from a report.
pub fn warn_fields(err: &Report) -> Fields {
    let mut fields = Fields::new().with("error", err.to_string());
    if let Some(location) = err.source_location() {
        fields.insert("error_source", location.to_string());
    }
    fields
}

const CORE_KEYS: [&str; 3] = ["time", "level", "msg"];
const RENAMED_PREFIX: &str = "fields.";

struct Record<'a> {
    time: String,
    level: Level,
    msg: &'a str,
    bound: &'a Fields,
    error: &'a Fields,
    fields: &'a Fields,
}

/// `key`, or `fields.<key>` (prefixed again as often as needed) when it is
/// already taken.
fn free_key(key: &str, taken: &HashSet<String>) -> String {
    let mut key = key.to_string();
    while taken.contains(&key) {
        key.insert_str(0, RENAMED_PREFIX);
    }
    key
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut taken: HashSet<String> = CORE_KEYS
            .iter()
            .map(|key| key.to_string())
            .chain(self.error.iter().map(|(key, _)| key.to_string()))
            .collect();

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("time", &self.time)?;
        map.serialize_entry("level", self.level.as_str())?;
        map.serialize_entry("msg", self.msg)?;
        for (key, value) in self.bound.iter() {
            let key = free_key(key, &taken);
            map.serialize_entry(&key, value)?;
            taken.insert(key);
        }
        for (key, value) in self.error.iter() {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in self.fields.iter() {
            let key = free_key(key, &taken);
            map.serialize_entry(&key, value)?;
            taken.insert(key);
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ADAPTERS;
    use crate::kv;
    use crate::testing::CaptureSink;
    use serde_json::{json, Value};

    fn capture(level: Level) -> (Logger, CaptureSink) {
        let sink = CaptureSink::new();
        (Logger::new(level, sink.clone()), sink)
    }

    #[test]
    fn test_record_shape_and_order() {
        let (logger, sink) = capture(Level::Debug);
        logger
            .with(kv! { "service" => "prices" })
            .info("Price updated successfully", kv! { "symbol" => "BTC/USD", "price" => 50000.0 });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        let time = line.find("\"time\"").unwrap();
        let level = line.find("\"level\"").unwrap();
        let msg = line.find("\"msg\"").unwrap();
        let service = line.find("\"service\"").unwrap();
        let symbol = line.find("\"symbol\"").unwrap();
        assert!(time < level && level < msg && msg < service && service < symbol);

        let record: Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["msg"], "Price updated successfully");
        assert_eq!(record["symbol"], "BTC/USD");
        assert_eq!(record["price"], 50000.0);
        assert!(chrono::DateTime::parse_from_rfc3339(record["time"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_level_filtering() {
        let (logger, sink) = capture(Level::Warn);
        logger.debug("d", kv! {});
        logger.info("i", kv! {});
        logger.warn("w", kv! {});
        logger.error("e", kv! {});

        let msgs: Vec<Value> = sink.records().into_iter().map(|r| r["msg"].clone()).collect();
        assert_eq!(msgs, vec![json!("w"), json!("e")]);
    }

    #[test]
    fn test_with_level_shares_sink() {
        let (logger, sink) = capture(Level::Error);
        let verbose = logger.with_level(Level::Debug);
        logger.info("dropped", kv! {});
        verbose.debug("kept", kv! {});

        assert_eq!(sink.len(), 1);
        assert_eq!(verbose.level(), Level::Debug);
        assert_eq!(logger.level(), Level::Error);
    }

    #[test]
    fn test_error_err_rich_fields() {
        let (logger, sink) = capture(Level::Info);
        let err = Report::msg("query execution failed")
            .with_hint("Check if the database is accessible")
            .with_detail("query=SELECT * FROM users timeout=5000ms")
            .with_domain(ADAPTERS)
            .wrap("failed to fetch user data");

        logger.error_err(
            "Database operation failed",
            &err,
            kv! { "user_id" => 12345, "operation" => "fetch_user_data" },
        );

        let record = sink.last().unwrap();
        assert_eq!(record["level"], "ERROR");
        assert_eq!(
            record["error"],
            "failed to fetch user data: query execution failed"
        );
        assert!(record["error_verbose"]
            .as_str()
            .unwrap()
            .contains("hint: Check if the database is accessible"));
        assert!(record["error_source"]
            .as_str()
            .unwrap()
            .contains("logger.rs"));
        assert_eq!(
            record["error_hints"],
            json!(["Check if the database is accessible"])
        );
        assert_eq!(
            record["error_details"],
            json!(["query=SELECT * FROM users timeout=5000ms"])
        );
        assert_eq!(record["error_domain"], "adapters");
        assert_eq!(record["user_id"], 12345);
        assert_eq!(record["operation"], "fetch_user_data");
    }

    #[test]
    fn test_error_err_omits_absent_annotations() {
        let (logger, sink) = capture(Level::Info);
        logger.error_err("failed", &Report::msg("plain"), kv! {});

        let record = sink.last().unwrap();
        assert_eq!(record["error"], "plain");
        assert!(record.get("error_hints").is_none());
        assert!(record.get("error_details").is_none());
        assert!(record.get("error_domain").is_none());
    }

    #[test]
    fn test_error_err_without_error_degrades() {
        let (logger, sink) = capture(Level::Info);
        logger.error_err("no error given", None, kv! { "k" => "v" });

        let record = sink.last().unwrap();
        assert_eq!(record["msg"], "no error given");
        assert_eq!(record["k"], "v");
        assert!(record.get("error").is_none());
    }

    #[test]
    fn test_warn_err_minimal_fields() {
        let (logger, sink) = capture(Level::Info);
        let err = Report::msg("busy")
            .with_hint("retry later")
            .with_domain(ADAPTERS);
        logger.warn_err("retrying", &err, kv! { "attempt" => 1 });

        let record = sink.last().unwrap();
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["error"], "busy");
        assert!(record.get("error_source").is_some());
        assert!(record.get("error_hints").is_none());
        assert!(record.get("error_domain").is_none());
        assert_eq!(record["attempt"], 1);
    }

    #[test]
    fn test_child_loggers() {
        let (logger, sink) = capture(Level::Info);
        let child = logger.with_component("worker").with_request_id("req_1");
        child.info("hello", kv! {});

        let record = sink.last().unwrap();
        assert_eq!(record["component"], "worker");
        assert_eq!(record["request_id"], "req_1");
        assert!(logger.fields().is_empty());
    }

    #[test]
    fn test_caller_fields_cannot_shadow_core_fields() {
        let (logger, sink) = capture(Level::Debug);
        logger.info(
            "real message",
            kv! { "msg" => "caller value", "level" => "DEBUG", "time" => "yesterday" },
        );

        let record = sink.last().unwrap();
        assert_eq!(record["msg"], "real message");
        assert_eq!(record["level"], "INFO");
        assert_ne!(record["time"], "yesterday");
        assert_eq!(record["fields.msg"], "caller value");
        assert_eq!(record["fields.level"], "DEBUG");
        assert_eq!(record["fields.time"], "yesterday");
    }

    #[test]
    fn test_caller_fields_cannot_shadow_error_fields() {
        let (logger, sink) = capture(Level::Info);
        let err = Report::msg("root cause").with_domain(ADAPTERS);
        logger.error_err(
            "failed",
            &err,
            kv! { "error" => "user supplied", "error_domain" => "mine" },
        );

        let record = sink.last().unwrap();
        assert_eq!(record["error"], "root cause");
        assert_eq!(record["error_domain"], "adapters");
        assert_eq!(record["fields.error"], "user supplied");
        assert_eq!(record["fields.error_domain"], "mine");

        logger.warn_err("retrying", &err, kv! { "error_source" => "elsewhere" });
        let record = sink.last().unwrap();
        assert!(record["error_source"].as_str().unwrap().contains("logger.rs"));
        assert_eq!(record["fields.error_source"], "elsewhere");
    }

    #[test]
    fn test_bound_and_call_fields_collide() {
        let (logger, sink) = capture(Level::Info);
        let err = Report::msg("boom");
        let child = logger.with(kv! { "component" => "api", "error" => "bound" });

        child.error_err(
            "failed",
            &err,
            kv! { "component" => "call", "fields.component" => "taken" },
        );

        let line = sink.lines().pop().unwrap();
        let record: Value = serde_json::from_str(&line).unwrap();
        let object = record.as_object().unwrap();
        assert_eq!(object["component"], "api");
        assert_eq!(object["error"], "boom");
        assert_eq!(object["fields.error"], "bound");
        assert_eq!(object["fields.component"], "call");
        assert_eq!(object["fields.fields.component"], "taken");

        // Every key in the rendered line is unique.
        let keys = line.matches("\":").count();
        assert_eq!(keys, object.len());
    }

    #[test]
    fn test_error_source_is_file_line_column() {
        let (logger, sink) = capture(Level::Info);
        let err = Report::msg("boom");
        let expected = err.source_location().unwrap();
        logger.error_err("failed", &err, kv! {});

        let record = sink.last().unwrap();
        let source = record["error_source"].as_str().unwrap();
        assert_eq!(
            source,
            format!("{}:{}:{}", expected.file(), expected.line(), expected.column())
        );
        assert!(!source.contains(" in "));
    }

    #[test]
    fn test_debug_impl() {
        let (logger, _) = capture(Level::Warn);
        let debug = format!("{:?}", logger);
        assert!(debug.contains("Logger"));
        assert!(debug.contains("Warn"));
    }
}
