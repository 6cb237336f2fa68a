use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::PROGRAM_LOG_LEVEL;

/// Stderr logger for the pronto tools.
///
/// Search results go to stdout; everything the engine and walker report
/// (skipped paths, commit failures, stat noise) lands on stderr so piped
/// output stays clean. The logger itself is stateless: filtering rides on
/// the global `log::max_level`, set once at install from the environment.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!(
            "{} {:<5} {} {}",
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Level filter from `PRONTO_LOG_LEVEL`. Unset or unparsable means Warn;
/// "off" silences the tools entirely.
fn env_level_filter() -> LevelFilter {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Install the stderr logger with the environment's level filter.
pub fn init() -> Result<(), SetLoggerError> {
    init_with(env_level_filter())
}

/// Install with an explicit filter. A second install attempt errors and
/// leaves the first logger (and its filter) in place; callers that do not
/// care, like the CLI, just drop the result.
pub fn init_with(filter: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
