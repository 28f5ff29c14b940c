//! Leveled, module-tagged logging.
//!
//! [`Logger`] is a small handle carrying a module name and a minimum
//! [`LogLevel`]. It filters on its own level and forwards to `tracing`, so the
//! installed subscriber decides where events end up. The level is passed in
//! explicitly (usually from [`NodeConfig`](crate::node::NodeConfig)); nothing
//! here reads the environment.
//!
//! Every event carries a `module` field. Informational events carry the
//! detail in `msg`; error events carry it in `error`. `critical` and `panic`
//! are emitted at `ERROR` with a `severity` field and never abort.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Log severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
    /// Critical level
    Critical,
    /// Panic level
    Panic,
}

impl LogLevel {
    /// Upper-case name as used in configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Panic => "PANIC",
        }
    }

    /// Matching `tracing` level
    pub const fn tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical | LogLevel::Panic => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown log level name
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            "PANIC" => Ok(LogLevel::Panic),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Module-tagged logger
#[derive(Debug, Clone)]
pub struct Logger {
    module: Cow<'static, str>,
    level: LogLevel,
}

impl Logger {
    /// Create a logger for `module` that drops events below `level`
    pub fn new(module: impl Into<Cow<'static, str>>, level: LogLevel) -> Self {
        Self {
            module: module.into(),
            level,
        }
    }

    /// Logger for another module at the same level
    pub fn for_module(&self, module: impl Into<Cow<'static, str>>) -> Self {
        Self::new(module, self.level)
    }

    /// Module name attached to every event
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Minimum level emitted
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether events at `level` pass this logger's filter
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Log a debug event
    pub fn debug(&self, desc: &str, msg: impl fmt::Display) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(module = %self.module, msg = %msg, "{desc}");
        }
    }

    /// Log an info event
    pub fn info(&self, desc: &str, msg: impl fmt::Display) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(module = %self.module, msg = %msg, "{desc}");
        }
    }

    /// Log a warning event
    pub fn warn(&self, desc: &str, msg: impl fmt::Display) {
        if self.enabled(LogLevel::Warn) {
            tracing::warn!(module = %self.module, msg = %msg, "{desc}");
        }
    }

    /// Log an error event
    pub fn error(&self, desc: &str, err: impl fmt::Display) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(module = %self.module, error = %err, "{desc}");
        }
    }

    /// Log a critical event
    pub fn critical(&self, desc: &str, err: impl fmt::Display) {
        if self.enabled(LogLevel::Critical) {
            tracing::error!(module = %self.module, severity = "critical", error = %err, "{desc}");
        }
    }

    /// Log a panic-severity event. Does not unwind.
    pub fn panic(&self, desc: &str, err: impl fmt::Display) {
        if self.enabled(LogLevel::Panic) {
            tracing::error!(module = %self.module, severity = "panic", error = %err, "{desc}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("Info".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" error ".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert_eq!("critical".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert_eq!("PANIC".parse::<LogLevel>(), Ok(LogLevel::Panic));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert_eq!(err, ParseLogLevelError("verbose".to_string()));
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_display_roundtrip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Critical,
            LogLevel::Panic,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_level_filtering() {
        let logger = Logger::new("test", LogLevel::Warn);

        assert!(!logger.enabled(LogLevel::Debug));
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Warn));
        assert!(logger.enabled(LogLevel::Error));
        assert!(logger.enabled(LogLevel::Panic));
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(LogLevel::Debug.tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Critical.tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Panic.tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_panic_does_not_unwind() {
        let logger = Logger::new("test", LogLevel::Debug);
        logger.critical("disk failure", "io error");
        logger.panic("unrecoverable", "state corrupted");
        logger.debug("still", "running");
    }

    #[test]
    fn test_for_module_keeps_level() {
        let logger = Logger::new("node", LogLevel::Error);
        let child = logger.for_module("node.client");

        assert_eq!(child.module(), "node.client");
        assert_eq!(child.level(), LogLevel::Error);
    }
}
