use btrdiff_stream::CommandKind;

use crate::change::{ChangeAction, FileChange};
use crate::diag::Diagnostic;
use crate::snapshot::SnapshotView;

/// Final pass over the aggregated records. Two stream artifacts need
/// suppressing: detaches of paths that never existed in OLD (phantom
/// deletions), and symlink creations that never materialized in NEW.
/// Lookup failures keep the record; a wrong extra record beats silently
/// losing a real one.
pub fn filter_phantoms(
    changes: Vec<FileChange>,
    old_view: &dyn SnapshotView,
    new_view: &dyn SnapshotView,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<FileChange> {
    let mut out = Vec::with_capacity(changes.len());

    for mut change in changes {
        match change.action {
            ChangeAction::Deleted => {
                if drop_as_phantom(&change, old_view, diagnostics) {
                    continue;
                }
            }
            ChangeAction::Modified if change.details.command == CommandKind::Symlink => {
                match new_view.contains(&change.path) {
                    Ok(true) => {}
                    Ok(false) => {
                        // Never appeared in NEW; at most this was a real
                        // deletion of an old link by the same name.
                        change.action = ChangeAction::Deleted;
                        if drop_as_phantom(&change, old_view, diagnostics) {
                            continue;
                        }
                    }
                    Err(e) => diagnostics.push(Diagnostic::SnapshotLookupFailed {
                        path: change.path.clone(),
                        error: e.to_string(),
                    }),
                }
            }
            _ => {}
        }
        out.push(change);
    }

    out
}

fn drop_as_phantom(
    change: &FileChange,
    old_view: &dyn SnapshotView,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    match old_view.contains(&change.path) {
        Ok(true) => false,
        Ok(false) => {
            diagnostics.push(Diagnostic::PhantomDropped {
                action: change.action,
                path: change.path.clone(),
            });
            true
        }
        Err(e) => {
            diagnostics.push(Diagnostic::SnapshotLookupFailed {
                path: change.path.clone(),
                error: e.to_string(),
            });
            false
        }
    }
}
