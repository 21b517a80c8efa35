//! Logging configuration enums.
//!
//! Plain enums with no CLI derives; embedders map their own flag parsing
//! onto them.

/// Verbosity of the crate's log output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// Failures only.
    Error,
    /// Failures plus conditions worth a second look (probe timeouts,
    /// persist failures, deadline overruns).
    Warn,
    /// Progress of sync passes, dispatch runs and warm-up/rehabilitation.
    Info,
    /// Per-request and per-host detail: fallbacks, quarantine changes,
    /// skipped cache files.
    Debug,
    /// Everything, including queue-level churn.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Shape of each emitted log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored single-line text for terminals.
    Plain,
    /// One JSON object per line for log shippers.
    Json,
}
