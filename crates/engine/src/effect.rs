use btrdiff_stream::{AttrMap, AttrTag, CommandKind, StreamPath};

use crate::snapshot::NodeKind;

/// How one decoded command updates the tracked model. Every command maps
/// to exactly one effect; the kind-specific attribute plumbing lives here
/// so the tracker only sees resolved paths and values.
#[derive(Debug, Clone)]
pub enum Effect {
    /// `subvol` / `snapshot`: names the stream root. No file change.
    SetRoot { path: StreamPath },
    /// A create-class command allocated a fresh inode at `path`.
    Create {
        ino: u64,
        kind: NodeKind,
        path: StreamPath,
    },
    /// `symlink` creates and carries its target in one command.
    CreateSymlink {
        ino: u64,
        path: StreamPath,
        target: StreamPath,
    },
    /// `link`: attach the inode already at `existing` to `path` as well.
    Link {
        path: StreamPath,
        existing: StreamPath,
    },
    Unlink { path: StreamPath },
    Rmdir { path: StreamPath },
    Rename { from: StreamPath, to: StreamPath },
    /// Content touched (`write`, `clone`, `update_extent`, `truncate`).
    Touch {
        path: StreamPath,
        size: Option<u64>,
    },
    /// Metadata-only touch; only surfaces when nothing stronger happened.
    TouchMetadata { path: StreamPath },
    /// `end`.
    Finish,
}

/// Map a command to its effect. `Err` names the attribute a command of
/// this kind requires but did not carry.
pub fn classify(kind: CommandKind, attrs: &AttrMap) -> Result<Effect, AttrTag> {
    use CommandKind::*;

    let path = |tag: AttrTag| attrs.path(tag).ok_or(tag);
    let ino = || attrs.u64(AttrTag::Ino).ok_or(AttrTag::Ino);

    Ok(match kind {
        Subvol | Snapshot => Effect::SetRoot {
            path: path(AttrTag::Path)?,
        },
        Mkfile => Effect::Create {
            ino: ino()?,
            kind: NodeKind::File,
            path: path(AttrTag::Path)?,
        },
        Mkdir => Effect::Create {
            ino: ino()?,
            kind: NodeKind::Directory,
            path: path(AttrTag::Path)?,
        },
        Mknod | Mkfifo | Mksock => Effect::Create {
            ino: ino()?,
            kind: NodeKind::Special,
            path: path(AttrTag::Path)?,
        },
        Symlink => Effect::CreateSymlink {
            ino: ino()?,
            path: path(AttrTag::Path)?,
            target: path(AttrTag::PathLink)?,
        },
        Rename => Effect::Rename {
            from: path(AttrTag::Path)?,
            to: path(AttrTag::PathTo)?,
        },
        Link => Effect::Link {
            path: path(AttrTag::Path)?,
            existing: path(AttrTag::PathLink)?,
        },
        Unlink => Effect::Unlink {
            path: path(AttrTag::Path)?,
        },
        Rmdir => Effect::Rmdir {
            path: path(AttrTag::Path)?,
        },
        Write | Clone => Effect::Touch {
            path: path(AttrTag::Path)?,
            size: None,
        },
        UpdateExtent | Truncate => Effect::Touch {
            path: path(AttrTag::Path)?,
            size: attrs.u64(AttrTag::Size),
        },
        Chmod | Chown | Utimes | SetXattr | RemoveXattr => Effect::TouchMetadata {
            path: path(AttrTag::Path)?,
        },
        End => Effect::Finish,
    })
}

/// Relative strength of command labels. When several commands touch one
/// inode, the strongest label becomes `details.command` in the output.
pub fn command_weight(kind: CommandKind) -> u8 {
    use CommandKind::*;
    match kind {
        Symlink => 6,
        Mkfile | Mkdir | Mknod | Mkfifo | Mksock => 5,
        UpdateExtent => 4,
        Truncate => 3,
        Write | Clone | Link => 2,
        Chmod | Chown | Utimes | SetXattr | RemoveXattr => 1,
        Subvol | Snapshot | Rename | Unlink | Rmdir | End => 0,
    }
}
