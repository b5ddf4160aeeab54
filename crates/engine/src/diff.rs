use btrdiff_stream::{
    CancelToken, CommandKind, DecodeOptions, SUPPORTED_VERSIONS, StreamDecoder, StreamError,
};
use log::debug;

use crate::aggregate::{collect_changes, sort_changes};
use crate::change::FileChange;
use crate::diag::Diagnostic;
use crate::effect::{Effect, classify};
use crate::phantom::filter_phantoms;
use crate::snapshot::SnapshotView;
use crate::tracker::PathTracker;

/// Knobs for one parse. The defaults match what the stream producer
/// actually emits in the wild: checksums unverified, both stream
/// versions accepted, irregularities tolerated and reported.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub verify_crc: bool,
    pub supported_versions: Vec<u32>,
    /// Surface changes where only mode/ownership/times/xattrs moved.
    pub emit_metadata_only_changes: bool,
    /// Turn every tolerated irregularity into a hard error.
    pub strict: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            verify_crc: false,
            supported_versions: SUPPORTED_VERSIONS.to_vec(),
            emit_metadata_only_changes: false,
            strict: false,
        }
    }
}

/// Result of a successful parse: the ordered change list plus every
/// irregularity that was tolerated along the way.
#[derive(Debug)]
pub struct DiffReport {
    pub changes: Vec<FileChange>,
    pub diagnostics: Vec<Diagnostic>,
    /// Raw commands decoded, including `end`.
    pub commands: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Strict mode promoted a diagnostic to a failure.
    #[error("strict mode: {0}")]
    Strict(Diagnostic),
}

/// Parse a send stream into user-level changes.
///
/// `old_view` and `new_view` look into the two snapshot trees the stream
/// spans; they are only consulted to resolve kinds of pre-existing
/// inodes and to drop phantom records. A parse is a pure function of
/// (bytes, views, options) — no global state, nothing persisted.
pub fn parse_stream(
    bytes: &[u8],
    old_view: &dyn SnapshotView,
    new_view: &dyn SnapshotView,
    options: &DiffOptions,
) -> Result<DiffReport, DiffError> {
    parse_inner(bytes, old_view, new_view, options, None)
}

/// Like [`parse_stream`], checking `cancel` between commands.
pub fn parse_stream_with_cancel(
    bytes: &[u8],
    old_view: &dyn SnapshotView,
    new_view: &dyn SnapshotView,
    options: &DiffOptions,
    cancel: &CancelToken,
) -> Result<DiffReport, DiffError> {
    parse_inner(bytes, old_view, new_view, options, Some(cancel.clone()))
}

fn parse_inner(
    bytes: &[u8],
    old_view: &dyn SnapshotView,
    new_view: &dyn SnapshotView,
    options: &DiffOptions,
    cancel: Option<CancelToken>,
) -> Result<DiffReport, DiffError> {
    let decode_options = DecodeOptions {
        verify_crc: options.verify_crc,
        supported_versions: options.supported_versions.clone(),
    };
    let mut decoder = StreamDecoder::new(bytes, &decode_options)?;
    if let Some(token) = cancel {
        decoder = decoder.with_cancel(token);
    }

    let mut tracker = PathTracker::new();
    let mut diagnostics = Vec::new();
    let mut commands = 0usize;

    while let Some(cmd) = decoder.next_command()? {
        commands += 1;

        let Some(kind) = cmd.kind else {
            let diag = Diagnostic::UnknownCommand {
                code: cmd.code,
                offset: cmd.offset,
            };
            if options.strict {
                return Err(DiffError::Strict(diag));
            }
            debug!("{diag}");
            diagnostics.push(diag);
            continue;
        };

        let effect = match classify(kind, &cmd.attrs) {
            Ok(effect) => effect,
            Err(attribute) => {
                let diag = Diagnostic::MissingAttribute {
                    command: kind,
                    attribute,
                };
                if options.strict {
                    return Err(DiffError::Strict(diag));
                }
                debug!("{diag}");
                diagnostics.push(diag);
                continue;
            }
        };

        let finished = apply_effect(&mut tracker, kind, effect);

        for issue in tracker.take_issues() {
            if options.strict {
                return Err(DiffError::Strict(issue));
            }
            debug!("{issue}");
            diagnostics.push(issue);
        }

        if finished {
            break;
        }
    }

    let changes = collect_changes(&tracker, new_view, options, &mut diagnostics);
    let mut changes = filter_phantoms(changes, old_view, new_view, &mut diagnostics);
    sort_changes(&mut changes);

    Ok(DiffReport {
        changes,
        diagnostics,
        commands,
    })
}

/// Returns true once the terminating command has been applied.
fn apply_effect(tracker: &mut PathTracker, kind: CommandKind, effect: Effect) -> bool {
    match effect {
        Effect::SetRoot { path } => tracker.set_root(path),
        Effect::Create {
            ino,
            kind: node_kind,
            path,
        } => tracker.allocate(ino, node_kind, path, kind),
        Effect::CreateSymlink { ino, path, target } => tracker.allocate_symlink(ino, path, target),
        Effect::Link { path, existing } => tracker.link(path, existing),
        Effect::Unlink { path } => tracker.detach(path, CommandKind::Unlink),
        Effect::Rmdir { path } => tracker.detach(path, CommandKind::Rmdir),
        Effect::Rename { from, to } => tracker.rename(from, to),
        Effect::Touch { path, size } => tracker.mark_dirty(path, kind, size),
        Effect::TouchMetadata { path } => tracker.touch_metadata(path, kind),
        Effect::Finish => return true,
    }
    false
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
