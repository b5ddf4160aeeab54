use super::*;
use btrdiff_engine::{ChangeAction, ChangeDetails, FileChange};
use btrdiff_stream::{CommandKind, StreamPath};

fn change(path: &str, action: ChangeAction, command: CommandKind) -> FileChange {
    let mut details = ChangeDetails::new(command);
    details.is_directory = Some(false);
    if action == ChangeAction::Renamed {
        details.path_to = Some(StreamPath::from("dest"));
    }
    FileChange::new(StreamPath::from(path), action, details)
}

fn print_all(printer: &mut dyn ChangePrinter, changes: &[FileChange]) {
    let ctx = PrintContext {
        total: changes.len(),
        diagnostics: 0,
    };
    printer.begin(&ctx).unwrap();
    for c in changes {
        printer.row(c, &ctx).unwrap();
    }
    printer.finish(&ctx).unwrap();
}

#[test]
fn json_printer_emits_parseable_array() {
    let changes = vec![
        change("a", ChangeAction::Modified, CommandKind::Mkfile),
        change("b", ChangeAction::Deleted, CommandKind::Unlink),
    ];

    let mut buf = Vec::new();
    let mut printer = JsonPrinter::new(&mut buf);
    print_all(&mut printer, &changes);

    let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["path"], "a");
    assert_eq!(array[0]["action"], "modified");
    assert_eq!(array[0]["details"]["command"], "mkfile");
    assert_eq!(array[0]["details"]["is_directory"], false);
    assert_eq!(array[1]["action"], "deleted");
    // Absent optionals stay out of the serialized shape.
    assert!(array[0]["details"].get("path_to").is_none());
}

#[test]
fn summary_printer_counts_by_action_and_command() {
    let changes = vec![
        change("a", ChangeAction::Modified, CommandKind::Mkfile),
        change("b", ChangeAction::Modified, CommandKind::Mkfile),
        change("c", ChangeAction::Deleted, CommandKind::Unlink),
        change("d", ChangeAction::Renamed, CommandKind::Rename),
    ];

    let mut buf = Vec::new();
    let mut printer = SummaryPrinter::new(&mut buf);
    print_all(&mut printer, &changes);

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("Summary of 4 changes:"));
    assert!(text.contains("modified: 2"));
    assert!(text.contains("deleted: 1"));
    assert!(text.contains("renamed: 1"));
    assert!(text.contains("mkfile: 2"));
}

#[test]
fn table_printer_truncates_and_reports_remainder() {
    let changes: Vec<FileChange> = (0..5)
        .map(|i| {
            change(
                &format!("file{i}"),
                ChangeAction::Modified,
                CommandKind::Mkfile,
            )
        })
        .collect();

    let cfg = PrinterConfig {
        color: ColorChoice::Never,
        limit: 3,
    };
    let mut buf = Vec::new();
    let mut printer = TablePrinter::new(&mut buf, cfg, false);
    print_all(&mut printer, &changes);

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("file0"));
    assert!(text.contains("file2"));
    assert!(!text.contains("file3"));
    assert!(text.contains("... and 2 more changes"));
}

#[test]
fn table_printer_shows_rename_destination() {
    let changes = vec![change("src", ChangeAction::Renamed, CommandKind::Rename)];

    let cfg = PrinterConfig {
        color: ColorChoice::Never,
        limit: 50,
    };
    let mut buf = Vec::new();
    let mut printer = TablePrinter::new(&mut buf, cfg, false);
    print_all(&mut printer, &changes);

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("-> dest"));
}

#[test]
fn output_format_parses_known_names_only() {
    assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
    assert_eq!(OutputFormat::parse("summary"), Some(OutputFormat::Summary));
    assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Table));
    assert_eq!(OutputFormat::parse("yaml"), None);
}
