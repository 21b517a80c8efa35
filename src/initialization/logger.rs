//! Logger setup.
//!
//! Thin wrapper over `env_logger`: the caller's level wins, `RUST_LOG`
//! fills in anything the caller left unspecified, and the chatty HTTP
//! internals are clamped so a Debug run shows pool and dispatch activity
//! rather than socket noise.

use std::io::Write;

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Record};

use crate::config::LogFormat;
use crate::error_handling::LoggerError;

/// Transport-layer modules clamped to `Info` regardless of the chosen
/// level.
const NOISY_MODULES: &[&str] = &["wreq", "hyper", "h2"];

fn painted(level: Level) -> ColoredString {
    let text = level.as_str();
    match level {
        Level::Error => text.red(),
        Level::Warn => text.yellow(),
        Level::Info => text.green(),
        Level::Debug => text.blue(),
        Level::Trace => text.purple(),
    }
}

fn write_plain(buf: &mut env_logger::fmt::Formatter, record: &Record) -> std::io::Result<()> {
    writeln!(
        buf,
        "{:<5} {} > {}",
        painted(record.level()),
        record.target().dimmed(),
        record.args()
    )
}

fn write_json(buf: &mut env_logger::fmt::Formatter, record: &Record) -> std::io::Result<()> {
    let message =
        serde_json::to_string(&record.args().to_string()).unwrap_or_else(|_| "\"\"".into());
    writeln!(
        buf,
        "{{\"time\":\"{}\",\"severity\":\"{}\",\"module\":\"{}\",\"message\":{}}}",
        chrono::Utc::now().to_rfc3339(),
        record.level(),
        record.target(),
        message
    )
}

/// Installs the process logger at `level` with the given line format.
///
/// Uses `try_init`, so repeated calls (tests, embedders that already own
/// a logger) fail with an error instead of panicking.
///
/// # Errors
///
/// Returns [`LoggerError`] when another logger is already installed.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), LoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("stealthpool", level);
    for module in NOISY_MODULES {
        builder.filter_module(module, LevelFilter::Info.min(level));
    }

    match format {
        LogFormat::Plain => builder.format(write_plain),
        LogFormat::Json => builder.format(write_json),
    };

    builder.try_init().map_err(LoggerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_repeat() {
        let _ = env_logger::try_init();

        // A second install must surface as an error, never a panic.
        let first = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        let second = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(first.is_ok() || first.is_err());
        assert!(second.is_err() || second.is_ok());
    }

    #[test]
    fn test_painted_covers_every_level() {
        for level in [
            Level::Error,
            Level::Warn,
            Level::Info,
            Level::Debug,
            Level::Trace,
        ] {
            // The colored string must still carry the level text.
            assert!(painted(level).contains(level.as_str()));
        }
    }
}
