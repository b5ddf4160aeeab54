use btrdiff_stream::{CommandKind, StreamPath};

use super::PathTracker;
use crate::diag::Diagnostic;
use crate::snapshot::NodeKind;

fn p(s: &str) -> StreamPath {
    StreamPath::from(s)
}

#[test]
fn allocate_attaches_and_indexes() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.assert_invariants();

    let id = t.inode_at(&p("a")).unwrap();
    assert_eq!(id, 10);
    let state = t.get(id).unwrap();
    assert!(state.created_in_stream);
    assert_eq!(state.kind, NodeKind::File);
    assert_eq!(state.primary_path, Some(p("a")));
    assert!(state.initial_paths.is_empty());
}

#[test]
fn duplicate_allocation_is_reported_and_folded() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.allocate(10, NodeKind::File, p("b"), CommandKind::Mkfile);
    t.assert_invariants();

    let issues = t.take_issues();
    assert!(matches!(
        issues.as_slice(),
        [Diagnostic::DuplicateInode { inode: 10, .. }]
    ));

    // Second name stuck to the same inode.
    assert_eq!(t.inode_at(&p("a")), t.inode_at(&p("b")));
}

#[test]
fn reference_to_unseen_path_synthesizes_inode() {
    let mut t = PathTracker::new();
    t.mark_dirty(p("pre/existing"), CommandKind::Write, None);
    t.assert_invariants();

    let id = t.inode_at(&p("pre/existing")).unwrap();
    let state = t.get(id).unwrap();
    assert!(!state.created_in_stream);
    assert!(state.content_dirty);
    assert_eq!(state.initial_paths.iter().collect::<Vec<_>>(), vec![&p("pre/existing")]);
    assert!(state.stream_ino.is_none());
    assert!(t.take_issues().is_empty());
}

#[test]
fn rename_preserves_identity_and_moves_primary() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("o10-5-0"), CommandKind::Mkfile);
    let id = t.inode_at(&p("o10-5-0")).unwrap();

    t.rename(p("o10-5-0"), p("final"));
    t.assert_invariants();

    assert_eq!(t.inode_at(&p("final")), Some(id));
    assert_eq!(t.inode_at(&p("o10-5-0")), None);
    assert_eq!(t.get(id).unwrap().primary_path, Some(p("final")));
}

#[test]
fn rename_chain_collapses_to_one_inode() {
    let mut t = PathTracker::new();
    t.rename(p("a"), p("tmp"));
    t.rename(p("tmp"), p("b"));
    t.assert_invariants();

    let id = t.inode_at(&p("b")).unwrap();
    let state = t.get(id).unwrap();
    assert_eq!(state.initial_paths.iter().collect::<Vec<_>>(), vec![&p("a")]);
    assert_eq!(state.paths.iter().collect::<Vec<_>>(), vec![&p("b")]);
}

#[test]
fn hard_link_shares_the_inode() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.link(p("b"), p("a"));
    t.assert_invariants();

    assert_eq!(t.inode_at(&p("a")), t.inode_at(&p("b")));
    let state = t.get(10).unwrap();
    assert_eq!(state.paths.len(), 2);
    // First attach stays primary.
    assert_eq!(state.primary_path, Some(p("a")));
}

#[test]
fn detach_of_primary_falls_back_to_smallest_remaining() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.link(p("c"), p("a"));
    t.link(p("b"), p("a"));

    t.detach(p("a"), CommandKind::Unlink);
    t.assert_invariants();

    assert_eq!(t.get(10).unwrap().primary_path, Some(p("b")));
}

#[test]
fn detach_then_reference_is_stale() {
    let mut t = PathTracker::new();
    t.detach(p("ghost"), CommandKind::Unlink);
    assert!(t.take_issues().is_empty());

    t.mark_dirty(p("ghost"), CommandKind::Write, None);
    let issues = t.take_issues();
    assert!(matches!(
        issues.as_slice(),
        [Diagnostic::StalePath {
            command: CommandKind::Write,
            ..
        }]
    ));
}

#[test]
fn attach_over_occupied_path_evicts_previous_holder() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.allocate(11, NodeKind::File, p("tmp"), CommandKind::Mkfile);

    // Overwriting rename: "tmp" takes over the name "a".
    t.rename(p("tmp"), p("a"));
    t.assert_invariants();

    assert_eq!(t.inode_at(&p("a")), Some(11));
    let evicted = t.get(10).unwrap();
    assert!(evicted.deleted());
}

#[test]
fn directory_rename_rebases_tracked_children() {
    let mut t = PathTracker::new();
    t.allocate(20, NodeKind::Directory, p("dir"), CommandKind::Mkdir);
    t.allocate(21, NodeKind::File, p("dir/child"), CommandKind::Mkfile);
    t.allocate(22, NodeKind::File, p("dir/sub/leaf"), CommandKind::Mkfile);

    t.rename(p("dir"), p("renamed"));
    t.assert_invariants();

    assert_eq!(t.inode_at(&p("renamed/child")), Some(21));
    assert_eq!(t.inode_at(&p("renamed/sub/leaf")), Some(22));
    assert_eq!(t.inode_at(&p("dir/child")), None);
    assert_eq!(t.get(21).unwrap().primary_path, Some(p("renamed/child")));
}

#[test]
fn rmdir_fixes_kind_or_reports_conflict() {
    let mut t = PathTracker::new();
    t.detach(p("somedir"), CommandKind::Rmdir);
    let id_issues = t.take_issues();
    assert!(id_issues.is_empty());

    t.allocate(10, NodeKind::File, p("f"), CommandKind::Mkfile);
    t.detach(p("f"), CommandKind::Rmdir);
    let issues = t.take_issues();
    assert!(matches!(
        issues.as_slice(),
        [Diagnostic::KindConflict {
            have: NodeKind::File,
            ..
        }]
    ));
}

#[test]
fn symlink_allocation_records_target_and_kind() {
    let mut t = PathTracker::new();
    t.allocate_symlink(30, p("lnk"), p("../target"));
    t.assert_invariants();

    let state = t.get(30).unwrap();
    assert_eq!(state.kind, NodeKind::Symlink);
    assert_eq!(state.symlink_target, Some(p("../target")));
    assert_eq!(state.best_command, Some(CommandKind::Symlink));
}

#[test]
fn strongest_command_label_wins() {
    let mut t = PathTracker::new();
    t.allocate(10, NodeKind::File, p("a"), CommandKind::Mkfile);
    t.mark_dirty(p("a"), CommandKind::Write, None);
    t.mark_dirty(p("a"), CommandKind::Truncate, Some(4));

    let state = t.get(10).unwrap();
    assert_eq!(state.best_command, Some(CommandKind::Mkfile));
    assert_eq!(state.size, Some(4));

    let mut t2 = PathTracker::new();
    t2.mark_dirty(p("b"), CommandKind::Write, None);
    t2.mark_dirty(p("b"), CommandKind::UpdateExtent, Some(8));
    t2.mark_dirty(p("b"), CommandKind::Truncate, Some(2));

    let id = t2.inode_at(&p("b")).unwrap();
    let state = t2.get(id).unwrap();
    assert_eq!(state.best_command, Some(CommandKind::UpdateExtent));
    assert_eq!(state.size, Some(2));
}
