use std::fs;

use btrdiff_engine::{ChangeAction, ChangeDetails, FileChange};
use btrdiff_stream::{CommandKind, StreamPath};
use chrono::{TimeDelta, Utc};
use tempfile::tempdir;

use super::{check_deletions, check_modifications, check_symlinks};

fn symlink_change(path: &str, target: &str) -> FileChange {
    let mut details = ChangeDetails::new(CommandKind::Symlink);
    details.path_link = Some(StreamPath::from(target));
    details.is_directory = Some(false);
    FileChange::new(StreamPath::from(path), ChangeAction::Modified, details)
}

fn deleted_change(path: &str) -> FileChange {
    let mut details = ChangeDetails::new(CommandKind::Unlink);
    details.is_directory = Some(false);
    FileChange::new(StreamPath::from(path), ChangeAction::Deleted, details)
}

fn modified_change(path: &str) -> FileChange {
    let mut details = ChangeDetails::new(CommandKind::Mkfile);
    details.is_directory = Some(false);
    FileChange::new(StreamPath::from(path), ChangeAction::Modified, details)
}

#[test]
fn symlinks_confirm_match_and_catch_mismatch() {
    let new = tempdir().unwrap();
    std::os::unix::fs::symlink("target-a", new.path().join("good")).unwrap();
    std::os::unix::fs::symlink("elsewhere", new.path().join("bad")).unwrap();
    fs::write(new.path().join("plain"), b"not a link").unwrap();

    let changes = vec![
        symlink_change("good", "target-a"),
        symlink_change("bad", "target-a"),
        symlink_change("plain", "target-a"),
        symlink_change("absent", "target-a"),
    ];

    let result = check_symlinks(&changes, new.path(), 10);
    assert_eq!(result.confirmed, 1);
    assert_eq!(result.target_mismatch, 1);
    assert_eq!(result.missing, 2);
    assert_eq!(result.errors, 0);
    assert_eq!(result.accuracy(), 25.0);
}

#[test]
fn deletions_compare_both_snapshots() {
    let old = tempdir().unwrap();
    let new = tempdir().unwrap();

    fs::write(old.path().join("gone"), b"x").unwrap();
    fs::write(old.path().join("kept"), b"x").unwrap();
    fs::write(new.path().join("kept"), b"x").unwrap();

    let changes = vec![
        deleted_change("gone"),
        deleted_change("kept"),
        deleted_change("never-was"),
    ];

    let result = check_deletions(&changes, old.path(), new.path(), 10);
    assert_eq!(result.confirmed, 1);
    assert_eq!(result.still_present, 1);
    assert_eq!(result.absent_from_old, 1);
    assert_eq!(result.accuracy(), 50.0);
}

#[test]
fn deletions_count_removed_symlinks_as_present_in_old() {
    let old = tempdir().unwrap();
    let new = tempdir().unwrap();

    // Broken symlink in OLD still counts as having existed.
    std::os::unix::fs::symlink("nowhere", old.path().join("dangling")).unwrap();

    let result = check_deletions(&[deleted_change("dangling")], old.path(), new.path(), 10);
    assert_eq!(result.confirmed, 1);
    assert_eq!(result.absent_from_old, 0);
}

#[test]
fn modifications_check_existence_and_window() {
    let new = tempdir().unwrap();
    fs::write(new.path().join("recent"), b"x").unwrap();

    let now = Utc::now();
    let window = Some((now - TimeDelta::hours(1), now + TimeDelta::hours(1)));

    let changes = vec![modified_change("recent"), modified_change("missing")];
    let result = check_modifications(&changes, new.path(), window, 10);
    assert_eq!(result.present, 1);
    assert_eq!(result.missing, 1);
    assert_eq!(result.mtime_in_window, 1);
    assert_eq!(result.mtime_outside_window, 0);

    // A window entirely in the past flags the fresh write.
    let stale = Some((now - TimeDelta::days(2), now - TimeDelta::days(1)));
    let result = check_modifications(&[modified_change("recent")], new.path(), stale, 10);
    assert_eq!(result.mtime_outside_window, 1);
}

#[test]
fn sample_cap_limits_work() {
    let new = tempdir().unwrap();
    let changes: Vec<_> = (0..20)
        .map(|i| modified_change(&format!("f{i}")))
        .collect();

    let result = check_modifications(&changes, new.path(), None, 5);
    assert_eq!(result.present + result.missing, 5);
}
