use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use btrdiff_engine::{ChangeAction, DiffOptions, FileChange, FsSnapshotView, parse_stream};
use btrdiff_runtime::DEFAULT_SNAPSHOT_PREFIX;
use btrdiff_stream::CommandKind;
use btrdiff_validator::{
    check_deletions, check_modifications, check_symlinks, snapshot_window,
};
use clap::Args;
use log::debug;

use crate::commands::CommandResult;
use crate::send;

#[derive(Debug, Args)]
pub struct ComprehensiveArgs {
    /// Directory containing the snapshots
    pub snapshot_root: PathBuf,

    /// Snapshot name prefix to match
    #[arg(long, short = 'p', default_value = DEFAULT_SNAPSHOT_PREFIX)]
    pub pattern: String,

    /// Number of records to check per category and pair
    #[arg(long, short = 's', default_value_t = 1000)]
    pub sample: usize,
}

struct PairRow {
    pair: String,
    total: usize,
    symlinks: String,
    deletions: String,
    modifications: String,
}

pub fn run(args: ComprehensiveArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: ComprehensiveArgs) -> CommandResult<ExitCode> {
    let snapshots = matching_snapshots(&args.snapshot_root, &args.pattern)?;
    if snapshots.len() < 2 {
        eprintln!(
            "[comprehensive] need at least 2 snapshots matching {:?} under {}",
            args.pattern,
            args.snapshot_root.display()
        );
        return Ok(ExitCode::from(1));
    }

    eprintln!(
        "[comprehensive] {} snapshots, sample size {}",
        snapshots.len(),
        args.sample
    );

    let mut rows = Vec::new();
    for pair in snapshots.windows(2) {
        let (old, new) = (&pair[0], &pair[1]);
        eprintln!("[comprehensive] {} -> {}", name_of(old), name_of(new));
        rows.push(validate_pair(old, new, args.sample)?);
    }

    print_table(&rows);
    Ok(ExitCode::SUCCESS)
}

/// Snapshot directories matching the prefix, in name order. The naming
/// convention puts timestamps in the name, so lexicographic order is
/// temporal order.
fn matching_snapshots(root: &Path, pattern: &str) -> CommandResult<Vec<PathBuf>> {
    let mut snapshots = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(pattern) {
            snapshots.push(entry.path());
        }
    }
    snapshots.sort();
    Ok(snapshots)
}

fn validate_pair(old: &Path, new: &Path, sample: usize) -> CommandResult<PairRow> {
    let bytes = send::load_stream(old, new, None)?;
    let old_view = FsSnapshotView::new(old);
    let new_view = FsSnapshotView::new(new);
    let report = parse_stream(&bytes, &old_view, &new_view, &DiffOptions::default())?;
    debug!(
        "{} -> {}: {} changes, {} diagnostics",
        name_of(old),
        name_of(new),
        report.changes.len(),
        report.diagnostics.len()
    );

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

    let symlink_cell = if symlinks.is_empty() {
        "n/a".to_owned()
    } else {
        let r = check_symlinks(&symlinks, new, sample);
        format!("{}/{}", r.confirmed, r.checked())
    };

    let deletion_cell = if deletions.is_empty() {
        "n/a".to_owned()
    } else {
        let r = check_deletions(&deletions, old, new, sample);
        format!("{}/{}", r.confirmed, r.confirmed + r.still_present)
    };

    let modification_cell = if modifications.is_empty() {
        "n/a".to_owned()
    } else {
        let window = snapshot_window(&name_of(old), &name_of(new));
        let r = check_modifications(&modifications, new, window, sample);
        format!("{}/{}", r.present, r.present + r.missing)
    };

    Ok(PairRow {
        pair: format!("{} -> {}", name_of(old), name_of(new)),
        total: report.changes.len(),
        symlinks: symlink_cell,
        deletions: deletion_cell,
        modifications: modification_cell,
    })
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_table(rows: &[PairRow]) {
    let pair_width = rows
        .iter()
        .map(|r| r.pair.len())
        .max()
        .unwrap_or(4)
        .max("PAIR".len());

    println!(
        "{:<pair_width$}  {:>7}  {:>10}  {:>10}  {:>14}",
        "PAIR", "TOTAL", "SYMLINKS", "DELETIONS", "MODIFICATIONS"
    );
    for row in rows {
        println!(
            "{:<pair_width$}  {:>7}  {:>10}  {:>10}  {:>14}",
            row.pair, row.total, row.symlinks, row.deletions, row.modifications
        );
    }
}
