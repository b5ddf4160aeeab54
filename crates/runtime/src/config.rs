pub const PROGRAM_NAME: &str = "btrdiff";
pub const PROGRAM_LOG_LEVEL: &str = "BTRDIFF_LOG_LEVEL";

/// Set to "0" or "false" to run `btrfs send` without a sudo prefix.
pub const SUDO_ENV: &str = "BTRDIFF_SUDO";

/// Records checked per category when validating diff output.
pub const DEFAULT_VALIDATION_SAMPLE: usize = 10;

/// Rows printed by the table formatter before truncating.
pub const TABLE_ROW_LIMIT: usize = 50;

/// Default snapshot-name prefix for batch validation.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "data.";
