use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use btrdiff_engine::{FileChange, native_rel_path};
use chrono::{DateTime, Utc};
use log::debug;

/// Outcome counters for symlink validation against the NEW snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymlinkCheck {
    /// Link exists and points where the diff said it would.
    pub confirmed: usize,
    /// Path is absent or is not a symlink.
    pub missing: usize,
    /// Link exists but points somewhere else.
    pub target_mismatch: usize,
    /// Lookups that failed outright (permissions and the like).
    pub errors: usize,
}

impl SymlinkCheck {
    pub fn checked(&self) -> usize {
        self.confirmed + self.missing + self.target_mismatch
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.confirmed, self.checked())
    }
}

/// Outcome counters for deletion validation across both snapshots.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletionCheck {
    /// Present in OLD and gone from NEW: the deletion really happened.
    pub confirmed: usize,
    /// Still present in NEW.
    pub still_present: usize,
    /// Never present in OLD; the record should not have survived.
    pub absent_from_old: usize,
    pub errors: usize,
}

impl DeletionCheck {
    pub fn accuracy(&self) -> f64 {
        ratio(self.confirmed, self.confirmed + self.still_present)
    }
}

/// Outcome counters for modification validation against NEW.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModificationCheck {
    pub present: usize,
    pub missing: usize,
    /// mtime falls inside the window between the two snapshot times.
    pub mtime_in_window: usize,
    pub mtime_outside_window: usize,
    pub errors: usize,
}

impl ModificationCheck {
    pub fn accuracy(&self) -> f64 {
        ratio(self.present, self.present + self.missing)
    }
}

/// Check up to `max_check` symlink records: does the link exist in the
/// NEW snapshot, and does its target match what the stream recorded?
pub fn check_symlinks(changes: &[FileChange], new_root: &Path, max_check: usize) -> SymlinkCheck {
    let mut result = SymlinkCheck::default();

    for change in changes.iter().take(max_check) {
        let Some(expected) = &change.details.path_link else {
            continue;
        };
        let full = new_root.join(native_rel_path(&change.path));

        match fs::symlink_metadata(&full) {
            Ok(meta) if meta.file_type().is_symlink() => match fs::read_link(&full) {
                Ok(actual) => {
                    if actual == native_rel_path(expected) {
                        result.confirmed += 1;
                    } else {
                        debug!(
                            "symlink {} points at {:?}, expected {}",
                            change.path, actual, expected
                        );
                        result.target_mismatch += 1;
                    }
                }
                Err(e) => {
                    debug!("readlink {} failed: {e}", change.path);
                    result.errors += 1;
                }
            },
            Ok(_) => result.missing += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => result.missing += 1,
            Err(e) => {
                debug!("stat {} failed: {e}", change.path);
                result.errors += 1;
            }
        }
    }

    result
}

/// Check up to `max_check` deletion records: the path must have existed
/// in OLD and be gone from NEW.
pub fn check_deletions(
    changes: &[FileChange],
    old_root: &Path,
    new_root: &Path,
    max_check: usize,
) -> DeletionCheck {
    let mut result = DeletionCheck::default();

    for change in changes.iter().take(max_check) {
        let rel = native_rel_path(&change.path);

        match probe(&old_root.join(&rel)) {
            Ok(None) => {
                result.absent_from_old += 1;
                continue;
            }
            Ok(Some(_)) => {}
            Err(e) => {
                debug!("stat old {} failed: {e}", change.path);
                result.errors += 1;
                continue;
            }
        }

        match probe(&new_root.join(&rel)) {
            Ok(None) => result.confirmed += 1,
            Ok(Some(_)) => result.still_present += 1,
            Err(e) => {
                debug!("stat new {} failed: {e}", change.path);
                result.errors += 1;
            }
        }
    }

    result
}

/// Check up to `max_check` modification records: the path must exist in
/// NEW and, when a window is given, its mtime must fall inside it.
pub fn check_modifications(
    changes: &[FileChange],
    new_root: &Path,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    max_check: usize,
) -> ModificationCheck {
    let mut result = ModificationCheck::default();

    for change in changes.iter().take(max_check) {
        match probe(&new_root.join(native_rel_path(&change.path))) {
            Ok(Some(meta)) => {
                result.present += 1;
                if let Some((start, end)) = window {
                    match meta.modified() {
                        Ok(mtime) => {
                            let mtime: DateTime<Utc> = mtime.into();
                            if mtime >= start && mtime <= end {
                                result.mtime_in_window += 1;
                            } else {
                                result.mtime_outside_window += 1;
                            }
                        }
                        Err(e) => {
                            debug!("mtime of {} unavailable: {e}", change.path);
                            result.errors += 1;
                        }
                    }
                }
            }
            Ok(None) => result.missing += 1,
            Err(e) => {
                debug!("stat {} failed: {e}", change.path);
                result.errors += 1;
            }
        }
    }

    result
}

fn probe(path: &Path) -> io::Result<Option<Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    hits as f64 / total as f64 * 100.0
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
