mod config;
pub mod logging;

pub use config::{
    DEFAULT_SNAPSHOT_PREFIX, DEFAULT_VALIDATION_SAMPLE, PROGRAM_LOG_LEVEL, PROGRAM_NAME, SUDO_ENV,
    TABLE_ROW_LIMIT,
};

pub use logging::init;
