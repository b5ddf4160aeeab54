use std::sync::OnceLock;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::{PROGRAM_LOG_LEVEL, PROGRAM_NAME};

pub const DEFAULT_LEVEL: Level = Level::Warn;

/// Stderr logger for the btrdiff tools. Diff output owns stdout, so log
/// lines always go to stderr, tagged with the program name and the
/// emitting module.
pub struct Logger {
    level: Level,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        eprintln!(
            "{timestamp} {:<5} {}[{}] {}",
            record.level(),
            PROGRAM_NAME,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_from_env() -> Level {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .and_then(|level| level.to_level())
        .unwrap_or(DEFAULT_LEVEL)
}

/// Install the logger, reading the level from `BTRDIFF_LOG_LEVEL`.
pub fn init() -> Result<(), SetLoggerError> {
    init_with_level(level_from_env())
}

pub fn init_with_level(level: Level) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    // The first caller decides the level; later calls are no-ops so the
    // installed max level and the logger's own threshold cannot diverge.
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let logger = LOGGER.get_or_init(|| Logger { level });
    log::set_logger(logger)?;
    log::set_max_level(level.to_level_filter());
    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
