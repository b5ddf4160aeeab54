use std::io;
use std::path::{Path, PathBuf};

use btrdiff_stream::StreamPath;
use hashbrown::HashMap;

/// What kind of filesystem object a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
    /// Device node, fifo or socket.
    Special,
    #[default]
    Unknown,
}

impl NodeKind {
    pub fn is_directory(self) -> Option<bool> {
        match self {
            NodeKind::Directory => Some(true),
            NodeKind::File | NodeKind::Symlink | NodeKind::Special => Some(false),
            NodeKind::Unknown => None,
        }
    }
}

/// Read-only lookups into one snapshot tree. The parse consults at most
/// two of these (the OLD and NEW snapshots); they are the only places a
/// real run touches the filesystem.
pub trait SnapshotView {
    /// Does `path` (relative to the snapshot root) exist in this tree?
    fn contains(&self, path: &StreamPath) -> io::Result<bool>;

    /// Kind of the object at `path`; `Unknown` when the path is absent.
    fn kind_of(&self, path: &StreamPath) -> io::Result<NodeKind>;
}

/// Stream paths are raw bytes; on unix they map onto `OsStr` directly.
#[cfg(unix)]
pub fn native_rel_path(path: &StreamPath) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(path.as_bytes()))
}

#[cfg(not(unix))]
pub fn native_rel_path(path: &StreamPath) -> PathBuf {
    PathBuf::from(path.to_lossy_string())
}

/// A snapshot rooted at a directory on the live filesystem. Lookups use
/// `symlink_metadata` so broken symlinks still count as present.
pub struct FsSnapshotView {
    root: PathBuf,
}

impl FsSnapshotView {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &StreamPath) -> PathBuf {
        self.root.join(native_rel_path(path))
    }
}

impl SnapshotView for FsSnapshotView {
    fn contains(&self, path: &StreamPath) -> io::Result<bool> {
        match std::fs::symlink_metadata(self.full_path(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn kind_of(&self, path: &StreamPath) -> io::Result<NodeKind> {
        let meta = match std::fs::symlink_metadata(self.full_path(path)) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(NodeKind::Unknown),
            Err(e) => return Err(e),
        };
        let ft = meta.file_type();
        Ok(if ft.is_dir() {
            NodeKind::Directory
        } else if ft.is_symlink() {
            NodeKind::Symlink
        } else if ft.is_file() {
            NodeKind::File
        } else {
            NodeKind::Special
        })
    }
}

/// In-memory view over a fixed path table. Fixture support for tests and
/// for callers that already know both trees.
#[derive(Debug, Default)]
pub struct StaticView {
    entries: HashMap<StreamPath, NodeKind>,
}

impl StaticView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<StreamPath>, kind: NodeKind) -> &mut Self {
        self.entries.insert(path.into(), kind);
        self
    }

    pub fn with(mut self, path: impl Into<StreamPath>, kind: NodeKind) -> Self {
        self.insert(path, kind);
        self
    }
}

impl SnapshotView for StaticView {
    fn contains(&self, path: &StreamPath) -> io::Result<bool> {
        Ok(self.entries.contains_key(path.as_bytes()))
    }

    fn kind_of(&self, path: &StreamPath) -> io::Result<NodeKind> {
        Ok(self
            .entries
            .get(path.as_bytes())
            .copied()
            .unwrap_or(NodeKind::Unknown))
    }
}
