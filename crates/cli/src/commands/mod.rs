pub mod comprehensive;
pub mod diff;
pub mod validate;

use clap::Subcommand;
pub use comprehensive::ComprehensiveArgs;
pub use diff::DiffArgs;
pub use validate::ValidateArgs;

/// Common error type for command handlers
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the file changes between two snapshots.
    ///
    /// Example:
    ///   btrdiff diff /snaps/data.20240101T000001+0000 /snaps/data.20240102T000001+0000
    ///   btrdiff diff --format table OLD NEW
    Diff(DiffArgs),

    /// Cross-check diff output against the live snapshot trees.
    ///
    /// Example:
    ///   btrdiff validate -s 100 OLD NEW
    Validate(ValidateArgs),

    /// Diff and validate every consecutive snapshot pair under a root.
    ///
    /// Example:
    ///   btrdiff comprehensive /snaps --pattern data.
    Comprehensive(ComprehensiveArgs),
}
