use btrdiff_stream::{CommandKind, StreamPath};
use hashbrown::HashMap;

use crate::change::{ChangeAction, ChangeDetails, FileChange};
use crate::diag::Diagnostic;
use crate::diff::DiffOptions;
use crate::snapshot::{NodeKind, SnapshotView};
use crate::tracker::{InodeState, PathTracker};

/// Walk every tracked inode once and emit at most one change per logical
/// outcome. The raw command sequence is already folded into the tracker;
/// this pass only reads the end state.
pub fn collect_changes(
    tracker: &PathTracker,
    new_view: &dyn SnapshotView,
    options: &DiffOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<FileChange> {
    let mut out = Vec::new();
    let mut kinds = KindCache::default();

    for (_, state) in tracker.iter() {
        // Created and destroyed within one delta: a net no-op.
        if state.created_in_stream && state.deleted() {
            continue;
        }

        if state.deleted() {
            emit_deletions(state, &mut out);
            continue;
        }

        if state.created_in_stream || state.content_dirty {
            emit_modified(state, &mut kinds, new_view, diagnostics, &mut out);
            continue;
        }

        let gone: Vec<&StreamPath> = state.initial_paths.difference(&state.paths).collect();
        let added: Vec<&StreamPath> = state.paths.difference(&state.initial_paths).collect();

        if gone.is_empty() && added.is_empty() {
            if options.emit_metadata_only_changes && state.metadata_touched {
                emit_modified(state, &mut kinds, new_view, diagnostics, &mut out);
            }
            continue;
        }

        emit_renames(state, gone, added, &mut kinds, new_view, diagnostics, &mut out);
    }

    out
}

/// Deterministic output order: by path, deletions before renames before
/// modifications at the same path.
pub fn sort_changes(changes: &mut [FileChange]) {
    changes.sort_by(|a, b| a.path.cmp(&b.path).then(a.action.cmp(&b.action)));
}

/// One snapshot lookup per path, remembered across the walk.
#[derive(Default)]
struct KindCache {
    cache: HashMap<StreamPath, NodeKind>,
}

impl KindCache {
    fn resolve(
        &mut self,
        state: &InodeState,
        new_view: &dyn SnapshotView,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> NodeKind {
        if state.kind != NodeKind::Unknown {
            return state.kind;
        }
        let Some(path) = &state.primary_path else {
            return NodeKind::Unknown;
        };
        if let Some(kind) = self.cache.get(path.as_bytes()) {
            return *kind;
        }
        let kind = match new_view.kind_of(path) {
            Ok(kind) => kind,
            Err(e) => {
                diagnostics.push(Diagnostic::SnapshotLookupFailed {
                    path: path.clone(),
                    error: e.to_string(),
                });
                NodeKind::Unknown
            }
        };
        self.cache.insert(path.clone(), kind);
        kind
    }
}

fn deletion_command(state: &InodeState) -> CommandKind {
    if state.kind == NodeKind::Directory {
        CommandKind::Rmdir
    } else {
        CommandKind::Unlink
    }
}

/// Every name the inode held at the start is gone.
fn emit_deletions(state: &InodeState, out: &mut Vec<FileChange>) {
    let command = deletion_command(state);
    for path in &state.initial_paths {
        let mut details = ChangeDetails::new(command);
        details.inode = state.stream_ino;
        // A name removed via unlink was not a directory.
        details.is_directory = Some(command == CommandKind::Rmdir);
        out.push(FileChange::new(path.clone(), ChangeAction::Deleted, details));
    }
}

fn emit_modified(
    state: &InodeState,
    kinds: &mut KindCache,
    new_view: &dyn SnapshotView,
    diagnostics: &mut Vec<Diagnostic>,
    out: &mut Vec<FileChange>,
) {
    let Some(primary) = &state.primary_path else {
        return;
    };
    let Some(command) = state.best_command else {
        return;
    };
    let kind = kinds.resolve(state, new_view, diagnostics);

    let mut details = ChangeDetails::new(command);
    details.size = state.size;
    details.path_link = state.symlink_target.clone();
    details.inode = state.stream_ino;
    details.is_directory = kind.is_directory();
    out.push(FileChange::new(
        primary.clone(),
        ChangeAction::Modified,
        details,
    ));
}

/// Pure shuffle: names moved without content changes. Pair departures
/// with arrivals in byte order; leftovers degrade to deletions or plain
/// modifications. Streams that reshuffle only part of a hard-link set
/// get this canonical pairing, not a content-based match.
fn emit_renames(
    state: &InodeState,
    gone: Vec<&StreamPath>,
    added: Vec<&StreamPath>,
    kinds: &mut KindCache,
    new_view: &dyn SnapshotView,
    diagnostics: &mut Vec<Diagnostic>,
    out: &mut Vec<FileChange>,
) {
    let kind = kinds.resolve(state, new_view, diagnostics);
    let paired = gone.len().min(added.len());

    for (from, to) in gone.iter().zip(added.iter()) {
        let mut details = ChangeDetails::new(CommandKind::Rename);
        details.path_to = Some((*to).clone());
        details.inode = state.stream_ino;
        details.is_directory = kind.is_directory();
        out.push(FileChange::new(
            (*from).clone(),
            ChangeAction::Renamed,
            details,
        ));
    }

    for from in &gone[paired..] {
        let command = deletion_command(state);
        let mut details = ChangeDetails::new(command);
        details.inode = state.stream_ino;
        details.is_directory = Some(command == CommandKind::Rmdir);
        out.push(FileChange::new(
            (*from).clone(),
            ChangeAction::Deleted,
            details,
        ));
    }

    for to in &added[paired..] {
        let mut details = ChangeDetails::new(state.best_command.unwrap_or(CommandKind::Link));
        details.inode = state.stream_ino;
        details.is_directory = kind.is_directory();
        out.push(FileChange::new(
            (*to).clone(),
            ChangeAction::Modified,
            details,
        ));
    }
}
