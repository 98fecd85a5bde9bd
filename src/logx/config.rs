//! Logger configuration.

use serde::Deserialize;

use super::level::Level;

/// Environment variable holding the default log level name.
pub const LOG_ENV_VAR: &str = "FAULTLINE_LOG";

/// Settings for the process-wide logger.
///
/// Deserializes from any serde format, with every field optional:
///
/// ```
/// use faultline::logx::{Level, LogConfig};
///
/// let config: LogConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
/// assert_eq!(config.level, Level::Debug);
///
/// let config: LogConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.level, Level::Info);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum emitted level.
    pub level: Level,
}

impl LogConfig {
    /// Default configuration: info level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Read the level from `FAULTLINE_LOG`, falling back to info when the
    /// variable is unset or unrecognized. The name must match exactly, so
    /// surrounding whitespace also selects info.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup(LOG_ENV_VAR)
            .map(|name| Level::from_name(&name))
            .unwrap_or_default();
        LogConfig { level }
    }
}
