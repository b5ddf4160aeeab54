use std::fmt;

use btrdiff_stream::{AttrTag, CommandKind, StreamPath};

use crate::change::ChangeAction;
use crate::snapshot::NodeKind;

/// A tolerated irregularity observed during a parse. Real-world streams
/// from older producers bend the rules often enough that these are
/// collected and returned instead of failing the run; strict mode turns
/// each of them into a hard error.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// Command kind code outside the known table; the command was skipped.
    UnknownCommand { code: u16, offset: usize },
    /// A command arrived without an attribute its kind requires.
    MissingAttribute {
        command: CommandKind,
        attribute: AttrTag,
    },
    /// A create-class command reused an inode number already allocated.
    DuplicateInode { inode: u64, path: StreamPath },
    /// A command referenced a path that already left the tree.
    StalePath {
        command: CommandKind,
        path: StreamPath,
    },
    /// A command implies a kind that contradicts what is already known.
    KindConflict {
        path: StreamPath,
        have: NodeKind,
        command: CommandKind,
    },
    /// A record was dropped because the snapshot disagrees with the
    /// stream (phantom deletion or never-materialized symlink).
    PhantomDropped {
        action: ChangeAction,
        path: StreamPath,
    },
    /// A snapshot lookup failed; the affected record was kept.
    SnapshotLookupFailed { path: StreamPath, error: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownCommand { code, offset } => {
                write!(f, "unknown command code {code} at offset {offset}, skipped")
            }
            Diagnostic::MissingAttribute { command, attribute } => {
                write!(f, "{command} command without required attribute {attribute}")
            }
            Diagnostic::DuplicateInode { inode, path } => {
                write!(f, "inode {inode} allocated twice (at {path})")
            }
            Diagnostic::StalePath { command, path } => {
                write!(f, "{command} references {path}, which already left the tree")
            }
            Diagnostic::KindConflict {
                path,
                have,
                command,
            } => {
                write!(f, "{command} on {path} contradicts known kind {have:?}")
            }
            Diagnostic::PhantomDropped { action, path } => {
                write!(f, "dropped phantom {action} of {path}")
            }
            Diagnostic::SnapshotLookupFailed { path, error } => {
                write!(f, "snapshot lookup failed for {path}: {error}")
            }
        }
    }
}
