use std::fmt;

use btrdiff_stream::{CommandKind, StreamPath};
use serde::{Deserialize, Serialize};

/// User-level classification of a change. The variant order doubles as
/// the tie-break for output ordering: deletions sort before renames,
/// renames before modifications, at the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Deleted,
    Renamed,
    Modified,
}

impl ChangeAction {
    pub fn name(self) -> &'static str {
        match self {
            ChangeAction::Deleted => "deleted",
            ChangeAction::Renamed => "renamed",
            ChangeAction::Modified => "modified",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The low-level operation that best describes a change, plus whatever
/// the stream told us about the object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDetails {
    pub command: CommandKind,

    /// Last observed size, present for content changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Destination path; present exactly for renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_to: Option<StreamPath>,

    /// Symlink target; present when `command` is `symlink`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_link: Option<StreamPath>,

    /// Stream-assigned inode number, when the stream provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode: Option<u64>,

    /// `None` means the stream gave no usable signal either way.
    #[serde(default)]
    pub is_directory: Option<bool>,
}

impl ChangeDetails {
    pub fn new(command: CommandKind) -> Self {
        Self {
            command,
            size: None,
            path_to: None,
            path_link: None,
            inode: None,
            is_directory: None,
        }
    }
}

/// One user-visible change between the two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: StreamPath,
    pub action: ChangeAction,
    pub details: ChangeDetails,
}

impl FileChange {
    pub fn new(path: StreamPath, action: ChangeAction, details: ChangeDetails) -> Self {
        Self {
            path,
            action,
            details,
        }
    }
}
