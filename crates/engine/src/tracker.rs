use std::collections::BTreeSet;

use btrdiff_stream::{CommandKind, StreamPath};
use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::diag::Diagnostic;
use crate::effect::command_weight;
use crate::snapshot::NodeKind;

pub type InodeId = u64;

/// Ids for inodes the stream references but never creates. Stream inode
/// numbers are kernel object ids and never reach this range.
const SYNTHETIC_BIT: u64 = 1 << 63;

/// Everything known about one inode over the life of the stream.
#[derive(Debug, Default)]
pub struct InodeState {
    pub kind: NodeKind,
    /// Canonical path while attached: the rename destination or, after a
    /// plain detach, the byte-wise smallest surviving path.
    pub primary_path: Option<StreamPath>,
    /// Currently attached paths (hard links).
    pub paths: BTreeSet<StreamPath>,
    /// Paths the inode held when first seen. Empty for inodes the stream
    /// created; the basis for rename pairing and deletion records.
    pub initial_paths: BTreeSet<StreamPath>,
    pub created_in_stream: bool,
    pub content_dirty: bool,
    pub metadata_touched: bool,
    /// Last observed size in bytes.
    pub size: Option<u64>,
    pub symlink_target: Option<StreamPath>,
    /// Strongest command label seen for this inode.
    pub best_command: Option<CommandKind>,
    /// Inode number as assigned by the stream; `None` for synthesized
    /// entries.
    pub stream_ino: Option<u64>,
}

impl InodeState {
    pub fn deleted(&self) -> bool {
        self.paths.is_empty()
    }

    fn bump_command(&mut self, cmd: CommandKind) {
        let better = match self.best_command {
            None => true,
            Some(current) => command_weight(cmd) > command_weight(current),
        };
        if better {
            self.best_command = Some(cmd);
        }
    }
}

/// Tracks the logical path of every inode the stream touches, through
/// arbitrary rename and link chains. The inode table and the reverse
/// path index form a bipartite mapping; the index stores only ids, so
/// the table is the single owner of all state.
#[derive(Debug, Default)]
pub struct PathTracker {
    inodes: HashMap<InodeId, InodeState>,
    path_index: HashMap<StreamPath, InodeId>,
    /// Paths that left the tree and have not been re-attached. A later
    /// reference to one of these is a producer bug, not a pre-existing
    /// path we are learning about.
    retired: HashSet<StreamPath>,
    next_synthetic: u64,
    root: Option<StreamPath>,
    issues: Vec<Diagnostic>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_root(&mut self, path: StreamPath) {
        self.root = Some(path);
    }

    pub fn root(&self) -> Option<&StreamPath> {
        self.root.as_ref()
    }

    /// Drain irregularities recorded since the last call.
    pub fn take_issues(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.issues)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InodeId, &InodeState)> {
        self.inodes.iter().map(|(id, state)| (*id, state))
    }

    pub fn inode_at(&self, path: &StreamPath) -> Option<InodeId> {
        self.path_index.get(path.as_bytes()).copied()
    }

    pub fn get(&self, id: InodeId) -> Option<&InodeState> {
        self.inodes.get(&id)
    }

    /// Install a freshly created inode at `path`.
    pub fn allocate(&mut self, ino: u64, kind: NodeKind, path: StreamPath, cmd: CommandKind) {
        if self.inodes.contains_key(&ino) {
            self.issues.push(Diagnostic::DuplicateInode {
                inode: ino,
                path: path.clone(),
            });
            // Carry on treating it as another name for the known inode.
            self.attach_path(ino, path);
            if let Some(state) = self.inodes.get_mut(&ino) {
                if state.kind == NodeKind::Unknown {
                    state.kind = kind;
                }
                state.bump_command(cmd);
            }
            return;
        }

        let state = InodeState {
            kind,
            created_in_stream: true,
            best_command: Some(cmd),
            stream_ino: Some(ino),
            ..InodeState::default()
        };
        self.inodes.insert(ino, state);
        self.attach_path(ino, path);
    }

    pub fn allocate_symlink(&mut self, ino: u64, path: StreamPath, target: StreamPath) {
        self.allocate(ino, NodeKind::Symlink, path, CommandKind::Symlink);
        if let Some(state) = self.inodes.get_mut(&ino) {
            state.symlink_target = Some(target);
        }
    }

    /// `link`: the inode at `existing` gains the name `path`.
    pub fn link(&mut self, path: StreamPath, existing: StreamPath) {
        let Some(id) = self.resolve(&existing, CommandKind::Link) else {
            return;
        };
        self.attach_path(id, path);
        if let Some(state) = self.inodes.get_mut(&id) {
            state.bump_command(CommandKind::Link);
        }
    }

    /// `unlink` / `rmdir`: the name `path` leaves the tree.
    pub fn detach(&mut self, path: StreamPath, cmd: CommandKind) {
        let Some(id) = self.resolve(&path, cmd) else {
            return;
        };

        if cmd == CommandKind::Rmdir
            && let Some(state) = self.inodes.get_mut(&id)
        {
            match state.kind {
                NodeKind::Unknown => state.kind = NodeKind::Directory,
                NodeKind::Directory => {}
                have => self.issues.push(Diagnostic::KindConflict {
                    path: path.clone(),
                    have,
                    command: cmd,
                }),
            }
        }

        self.remove_name(id, &path);
        self.retired.insert(path);
    }

    /// `rename`: move a name, carrying the inode identity and any tracked
    /// descendants of the old name along with it.
    pub fn rename(&mut self, from: StreamPath, to: StreamPath) {
        if from == to {
            return;
        }
        let Some(id) = self.resolve(&from, CommandKind::Rename) else {
            return;
        };

        let from_was_primary = self
            .inodes
            .get(&id)
            .is_some_and(|s| s.primary_path.as_ref() == Some(&from));

        self.attach_path(id, to.clone());

        if let Some(state) = self.inodes.get_mut(&id) {
            state.paths.remove(&from);
            if from_was_primary || state.primary_path.as_ref() == Some(&from) {
                state.primary_path = Some(to.clone());
            }
        }
        self.path_index.remove(from.as_bytes());
        self.retired.insert(from.clone());

        self.rebase_descendants(&from, &to);
    }

    /// Later commands refer to tracked children of a renamed directory by
    /// their new full path; keep the index speaking that language.
    fn rebase_descendants(&mut self, from: &StreamPath, to: &StreamPath) {
        let moved: Vec<(StreamPath, InodeId)> = self
            .path_index
            .iter()
            .filter(|(p, _)| p.is_under(from))
            .map(|(p, id)| (p.clone(), *id))
            .collect();

        for (old_path, id) in moved {
            let new_path = old_path.rebase(from, to);
            debug!("rebase {old_path} -> {new_path} (inode {id:#x})");
            self.path_index.remove(old_path.as_bytes());
            self.path_index.insert(new_path.clone(), id);
            if let Some(state) = self.inodes.get_mut(&id) {
                state.paths.remove(&old_path);
                state.paths.insert(new_path.clone());
                if state.primary_path.as_ref() == Some(&old_path) {
                    state.primary_path = Some(new_path);
                }
            }
        }
    }

    pub fn mark_dirty(&mut self, path: StreamPath, cmd: CommandKind, size: Option<u64>) {
        let Some(id) = self.resolve(&path, cmd) else {
            return;
        };
        if let Some(state) = self.inodes.get_mut(&id) {
            state.content_dirty = true;
            if size.is_some() {
                state.size = size;
            }
            state.bump_command(cmd);
        }
    }

    pub fn touch_metadata(&mut self, path: StreamPath, cmd: CommandKind) {
        let Some(id) = self.resolve(&path, cmd) else {
            return;
        };
        if let Some(state) = self.inodes.get_mut(&id) {
            state.metadata_touched = true;
            state.bump_command(cmd);
        }
    }

    /// Find the inode holding `path`, synthesizing one for a path that
    /// pre-exists the stream. Returns `None` (and records the issue) for
    /// references to paths that already left the tree.
    fn resolve(&mut self, path: &StreamPath, cmd: CommandKind) -> Option<InodeId> {
        if let Some(id) = self.path_index.get(path.as_bytes()) {
            return Some(*id);
        }
        if self.retired.contains(path.as_bytes()) {
            self.issues.push(Diagnostic::StalePath {
                command: cmd,
                path: path.clone(),
            });
            return None;
        }

        let id = SYNTHETIC_BIT | self.next_synthetic;
        self.next_synthetic += 1;

        let mut state = InodeState::default();
        state.paths.insert(path.clone());
        state.initial_paths.insert(path.clone());
        state.primary_path = Some(path.clone());
        self.inodes.insert(id, state);
        self.path_index.insert(path.clone(), id);
        Some(id)
    }

    /// Attach `path` to `id`, evicting any previous holder of the name.
    fn attach_path(&mut self, id: InodeId, path: StreamPath) {
        if let Some(prev) = self.path_index.insert(path.clone(), id)
            && prev != id
        {
            debug!("path {path} implicitly detached from inode {prev:#x}");
            if let Some(prev_state) = self.inodes.get_mut(&prev) {
                prev_state.paths.remove(&path);
                if prev_state.primary_path.as_ref() == Some(&path) {
                    prev_state.primary_path = prev_state.paths.first().cloned();
                }
            }
        }

        self.retired.remove(path.as_bytes());
        if let Some(state) = self.inodes.get_mut(&id) {
            state.paths.insert(path.clone());
            if state.primary_path.is_none() {
                state.primary_path = Some(path);
            }
        }
    }

    fn remove_name(&mut self, id: InodeId, path: &StreamPath) {
        self.path_index.remove(path.as_bytes());
        if let Some(state) = self.inodes.get_mut(&id) {
            state.paths.remove(path);
            if state.primary_path.as_ref() == Some(path) {
                state.primary_path = state.paths.first().cloned();
            }
        }
    }

    /// Structural consistency of the two maps; test support.
    #[cfg(test)]
    pub fn assert_invariants(&self) {
        for (path, id) in &self.path_index {
            let state = self.inodes.get(id).expect("index points at live inode");
            assert!(
                state.paths.contains(path),
                "index entry {path} missing from inode {id:#x}"
            );
        }
        for (id, state) in &self.inodes {
            for path in &state.paths {
                assert_eq!(
                    self.path_index.get(path.as_bytes()),
                    Some(id),
                    "path {path} not indexed back to inode {id:#x}"
                );
            }
            match &state.primary_path {
                Some(primary) => assert!(
                    state.paths.contains(primary),
                    "primary {primary} not attached to inode {id:#x}"
                ),
                None => assert!(
                    state.paths.is_empty(),
                    "inode {id:#x} has paths but no primary"
                ),
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
