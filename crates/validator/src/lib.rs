mod checks;
mod snaptime;

pub use checks::{
    DeletionCheck, ModificationCheck, SymlinkCheck, check_deletions, check_modifications,
    check_symlinks,
};
pub use snaptime::{parse_snapshot_time, snapshot_window};
