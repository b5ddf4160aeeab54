use std::path::{Path, PathBuf};
use std::process::ExitCode;

use btrdiff_engine::{ChangeAction, DiffOptions, FileChange, FsSnapshotView, parse_stream};
use btrdiff_runtime::DEFAULT_VALIDATION_SAMPLE;
use btrdiff_stream::CommandKind;
use btrdiff_validator::{
    DeletionCheck, ModificationCheck, SymlinkCheck, check_deletions, check_modifications,
    check_symlinks, snapshot_window,
};
use clap::Args;
use log::debug;

use crate::commands::CommandResult;
use crate::send;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the old snapshot
    pub old_snapshot: PathBuf,

    /// Path to the new snapshot
    pub new_snapshot: PathBuf,

    /// Number of records to check per category
    #[arg(long, short = 's', default_value_t = DEFAULT_VALIDATION_SAMPLE)]
    pub sample: usize,

    /// Parse a previously captured stream instead of running btrfs send
    #[arg(long, value_name = "FILE")]
    pub stream_file: Option<PathBuf>,
}

pub fn run(args: ValidateArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: ValidateArgs) -> CommandResult<ExitCode> {
    let bytes = send::load_stream(
        &args.old_snapshot,
        &args.new_snapshot,
        args.stream_file.as_deref(),
    )?;

    let old_view = FsSnapshotView::new(&args.old_snapshot);
    let new_view = FsSnapshotView::new(&args.new_snapshot);
    let report = parse_stream(&bytes, &old_view, &new_view, &DiffOptions::default())?;

    let symlinks: Vec<FileChange> = report
        .changes
        .iter()
        .filter(|c| c.action == ChangeAction::Modified && c.details.command == CommandKind::Symlink)
        .cloned()
        .collect();
    let deletions: Vec<FileChange> = report
        .changes
        .iter()
        .filter(|c| c.action == ChangeAction::Deleted)
        .cloned()
        .collect();
    let modifications: Vec<FileChange> = report
        .changes
        .iter()
        .filter(|c| c.action == ChangeAction::Modified)
        .cloned()
        .collect();

    eprintln!(
        "[validate] {} changes ({} symlinks, {} deletions, {} modifications)",
        report.changes.len(),
        symlinks.len(),
        deletions.len(),
        modifications.len()
    );

    let window = snapshot_window(
        &dir_name(&args.old_snapshot),
        &dir_name(&args.new_snapshot),
    );
    if window.is_none() {
        debug!("snapshot names carry no parseable timestamps; skipping mtime window checks");
    }

    let mut failures = 0usize;

    if !symlinks.is_empty() {
        let result = check_symlinks(&symlinks, &args.new_snapshot, args.sample);
        failures += result.missing + result.target_mismatch;
        print_symlinks(&result);
    }

    if !deletions.is_empty() {
        let result = check_deletions(
            &deletions,
            &args.old_snapshot,
            &args.new_snapshot,
            args.sample,
        );
        failures += result.still_present + result.absent_from_old;
        print_deletions(&result);
    }

    if !modifications.is_empty() {
        let result = check_modifications(&modifications, &args.new_snapshot, window, args.sample);
        failures += result.missing;
        print_modifications(&result);
    }

    if failures > 0 {
        eprintln!("[validate] {failures} mismatches");
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_symlinks(result: &SymlinkCheck) {
    println!("Symlinks:");
    println!("  Confirmed: {}", result.confirmed);
    println!("  Missing: {}", result.missing);
    println!("  Mismatched targets: {}", result.target_mismatch);
    println!("  Accuracy: {:.1}%", result.accuracy());
}

fn print_deletions(result: &DeletionCheck) {
    println!("Deletions:");
    println!("  Actually deleted: {}", result.confirmed);
    println!("  Found in new: {}", result.still_present);
    println!("  Missing from old: {}", result.absent_from_old);
    println!("  Accuracy: {:.1}%", result.accuracy());
}

fn print_modifications(result: &ModificationCheck) {
    println!("Modifications:");
    println!("  File exists: {}", result.present);
    println!("  File missing: {}", result.missing);
    println!("  Timing in range: {}", result.mtime_in_window);
    println!("  Timing out of range: {}", result.mtime_outside_window);
    println!("  Existence accuracy: {:.1}%", result.accuracy());
}
