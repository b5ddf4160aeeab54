use std::process::ExitCode;

use clap::Parser;

mod commands;
mod printer;
mod send;

use btrdiff_runtime::logging;
use commands::Command;

#[derive(Debug, Parser)]
#[command(
    name = "btrdiff",
    version,
    about = "Semantic file changes between btrfs snapshots",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Diff(args) => commands::diff::run(args),
        Command::Validate(args) => commands::validate::run(args),
        Command::Comprehensive(args) => commands::comprehensive::run(args),
    }
}
