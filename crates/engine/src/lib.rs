mod aggregate;
mod change;
mod diag;
mod diff;
mod effect;
mod phantom;
mod snapshot;
mod tracker;

pub use change::{ChangeAction, ChangeDetails, FileChange};
pub use diag::Diagnostic;
pub use diff::{DiffError, DiffOptions, DiffReport, parse_stream, parse_stream_with_cancel};
pub use snapshot::{FsSnapshotView, NodeKind, SnapshotView, StaticView, native_rel_path};
pub use tracker::{InodeId, InodeState, PathTracker};
