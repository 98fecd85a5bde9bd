//! Log levels.

use std::fmt;

use serde::Deserialize;

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Normal operation (default).
    #[default]
    Info,
    /// Something went wrong but was handled.
    Warn,
    /// A failure that needs attention.
    Error,
}

impl Level {
    /// Parse a level name.
    ///
    /// Accepts `debug`, `info`, `warn` and `error` exactly; anything else
    /// (including other casings) falls back to [`Level::Info`].
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::logx::Level;
    ///
    /// assert_eq!(Level::from_name("warn"), Level::Warn);
    /// assert_eq!(Level::from_name("WARN"), Level::Info);
    /// assert_eq!(Level::from_name("verbose"), Level::Info);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }

    /// The lowercase configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    /// The uppercase label written into records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl From<String> for Level {
    fn from(name: String) -> Self {
        Level::from_name(&name)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_known() {
        assert_eq!(Level::from_name("debug"), Level::Debug);
        assert_eq!(Level::from_name("info"), Level::Info);
        assert_eq!(Level::from_name("warn"), Level::Warn);
        assert_eq!(Level::from_name("error"), Level::Error);
    }

    #[test]
    fn test_from_name_unknown_is_info() {
        assert_eq!(Level::from_name(""), Level::Info);
        assert_eq!(Level::from_name("Debug"), Level::Info);
        assert_eq!(Level::from_name("warning"), Level::Info);
    }

    #[test]
    fn test_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Level::Warn.as_str(), "WARN");
        assert_eq!(Level::Warn.name(), "warn");
        assert_eq!(Level::Error.to_string(), "ERROR");
        assert_eq!(Level::default(), Level::Info);
    }

    #[test]
    fn test_deserialize_lenient() {
        let level: Level = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, Level::Error);
        let level: Level = serde_json::from_str("\"loud\"").unwrap();
        assert_eq!(level, Level::Info);
    }
}
