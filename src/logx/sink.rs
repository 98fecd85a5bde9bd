//! Destinations for rendered log records.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use super::level::Level;

/// Receives one rendered JSON record per log call.
///
/// Sinks never fail from the caller's point of view: a sink that cannot
/// write drops the record.
pub trait Sink: Send + Sync {
    /// Write a single record. `line` holds no trailing newline.
    fn write_record(&self, level: Level, line: &str);
}

/// Writes newline-delimited records to any [`Write`] implementation.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W> WriterSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

impl<W> Sink for WriterSink<W>
where
    W: Write + Send,
{
    fn write_record(&self, _level: Level, line: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Dropped on I/O failure; logging must not take the caller down.
        let _ = writeln!(writer, "{}", line).and_then(|()| writer.flush());
    }
}

/// Forwards records to `tracing` as events.
///
/// The record's `msg` becomes the event message; every other field except
/// `time` and `level` is passed as one JSON object in a `fields` field.
/// Lets processes that already install a `tracing` subscriber route this
/// crate's records through it.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl Sink for TracingSink {
    fn write_record(&self, level: Level, line: &str) {
        let Ok(serde_json::Value::Object(mut record)) = serde_json::from_str(line) else {
            emit_tracing(level, line, "{}");
            return;
        };
        record.remove("time");
        record.remove("level");
        let msg = match record.remove("msg") {
            Some(serde_json::Value::String(msg)) => msg,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let fields = serde_json::Value::Object(record).to_string();
        emit_tracing(level, &msg, &fields);
    }
}

#[cfg(feature = "tracing")]
fn emit_tracing(level: Level, msg: &str, fields: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "faultline", fields = %fields, "{}", msg),
        Level::Info => tracing::info!(target: "faultline", fields = %fields, "{}", msg),
        Level::Warn => tracing::warn!(target: "faultline", fields = %fields, "{}", msg),
        Level::Error => tracing::error!(target: "faultline", fields = %fields, "{}", msg),
    }
}
