//! Structured JSON logging.
//!
//! Every record is one JSON object per line:
//!
//! ```text
//! {"time":"2026-01-02T03:04:05.678Z","level":"INFO","msg":"Price updated","symbol":"BTC/USD"}
//! ```
//!
//! Fields appear in order: `time`, `level`, `msg`, fields bound to the
//! logger, then the fields of the call. A bound or call field whose key is
//! already taken is written as `fields.<key>`, so the core fields always
//! read back as emitted.
//!
//! There is a process-wide logger used by the free functions in this module
//! and by the retry and recovery helpers when they are not given a logger of
//! their own. It starts at info level writing to stdout and is replaced as a
//! whole with [`set_logger`] or [`set_level`]; [`logger`] hands out a
//! snapshot that later replacements do not affect.
//!
//! # Examples
//!
//! ```
//! use faultline::{kv, logx, Report};
//!
//! logx::info("Starting price update", kv! { "symbol" => "BTC/USD" });
//!
//! let err = Report::msg("connection refused").with_hint("is the database up?");
//! logx::error_err("Database operation failed", &err, kv! { "user_id" => 12345 });
//! ```

mod config;
mod fields;
mod level;
mod logger;
mod sink;

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

pub use config::{LogConfig, LOG_ENV_VAR};
pub use fields::{Fields, FieldsError};
pub use level::Level;
pub use logger::{error_fields, warn_fields, Logger};
#[cfg(feature = "tracing")]
pub use sink::TracingSink;
pub use sink::{Sink, WriterSink};

use crate::report::Report;

static GLOBAL: LazyLock<ArcSwap<Logger>> =
    LazyLock::new(|| ArcSwap::from_pointee(Logger::stdout(Level::Info)));

/// A snapshot of the process-wide logger.
pub fn logger() -> Arc<Logger> {
    GLOBAL.load_full()
}

/// Replace the process-wide logger.
pub fn set_logger(logger: Logger) {
    GLOBAL.store(Arc::new(logger));
}

/// Replace the process-wide logger with one at the named level, keeping the
/// current sink and bound fields. Unknown names select info.
///
/// ```
/// use faultline::logx::{self, Level};
///
/// logx::set_level("warn");
/// assert_eq!(logx::logger().level(), Level::Warn);
/// logx::set_level("info");
/// ```
pub fn set_level(name: &str) {
    let level = Level::from_name(name);
    GLOBAL.rcu(|current| current.with_level(level));
}

/// Apply `config` to the process-wide logger.
pub fn init(config: &LogConfig) {
    set_level(config.level.name());
}

/// Log at debug level through the process-wide logger.
pub fn debug(msg: &str, fields: Fields) {
    GLOBAL.load().debug(msg, fields);
}

/// Log at info level through the process-wide logger.
pub fn info(msg: &str, fields: Fields) {
    GLOBAL.load().info(msg, fields);
}

/// Log at warn level through the process-wide logger.
pub fn warn(msg: &str, fields: Fields) {
    GLOBAL.load().warn(msg, fields);
}

/// Log at error level through the process-wide logger.
pub fn error(msg: &str, fields: Fields) {
    GLOBAL.load().error(msg, fields);
}

/// See [`Logger::error_err`].
pub fn error_err<'a>(msg: &str, err: impl Into<Option<&'a Report>>, fields: Fields) {
    GLOBAL.load().error_err(msg, err, fields);
}

/// See [`Logger::warn_err`].
pub fn warn_err<'a>(msg: &str, err: impl Into<Option<&'a Report>>, fields: Fields) {
    GLOBAL.load().warn_err(msg, err, fields);
}

/// A child of the process-wide logger with extra bound fields.
pub fn with(fields: Fields) -> Logger {
    logger().with(fields)
}

/// A child of the process-wide logger tagged with `component`.
pub fn with_component(component: &str) -> Logger {
    logger().with_component(component)
}
