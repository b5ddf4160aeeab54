use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use btrdiff_engine::{DiffOptions, DiffReport, FsSnapshotView, parse_stream};
use clap::Args;
use log::debug;

use crate::commands::CommandResult;
use crate::printer::{
    ChangePrinter, ColorChoice, JsonPrinter, OutputFormat, PrintContext, PrinterConfig,
    SummaryPrinter, TablePrinter,
};
use crate::send;

#[derive(Debug, Args)]
pub struct OutputOptions {
    /// Output format: json, summary, table
    #[arg(long, short = 'f', value_name = "FORMAT", default_value = "json")]
    pub format: String,

    /// When to use colors: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: String,
}

impl OutputOptions {
    /// Create a printer based on the output options.
    pub fn make_printer(&self) -> CommandResult<Box<dyn ChangePrinter>> {
        let format = OutputFormat::parse(&self.format)
            .ok_or_else(|| anyhow!("unknown format: {}", self.format))?;

        let color = match self.color.as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        };

        Ok(match format {
            OutputFormat::Json => Box::new(JsonPrinter::stdout()),
            OutputFormat::Summary => Box::new(SummaryPrinter::stdout()),
            OutputFormat::Table => Box::new(TablePrinter::stdout(PrinterConfig {
                color,
                ..PrinterConfig::default()
            })),
        })
    }
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Path to the old snapshot
    pub old_snapshot: PathBuf,

    /// Path to the new snapshot
    pub new_snapshot: PathBuf,

    /// Output formatting options
    #[command(flatten)]
    pub output: OutputOptions,

    /// Parse a previously captured stream instead of running btrfs send
    #[arg(long, value_name = "FILE")]
    pub stream_file: Option<PathBuf>,

    /// Verify per-command checksums while decoding
    #[arg(long)]
    pub verify_crc: bool,

    /// Fail on any stream irregularity instead of tolerating it
    #[arg(long)]
    pub strict: bool,

    /// Also report changes where only metadata moved
    #[arg(long)]
    pub metadata_changes: bool,
}

pub fn run(args: DiffArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: DiffArgs) -> CommandResult<ExitCode> {
    let report = diff_snapshots(&args)?;

    let mut printer = args.output.make_printer()?;
    let ctx = PrintContext {
        total: report.changes.len(),
        diagnostics: report.diagnostics.len(),
    };

    printer.begin(&ctx)?;
    for change in &report.changes {
        printer.row(change, &ctx)?;
    }
    printer.finish(&ctx)?;

    if !report.diagnostics.is_empty() {
        eprintln!(
            "[diff] tolerated {} stream irregularities (set BTRDIFF_LOG_LEVEL=debug for details)",
            report.diagnostics.len()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Capture and parse the stream for one snapshot pair.
pub fn diff_snapshots(args: &DiffArgs) -> CommandResult<DiffReport> {
    let bytes = send::load_stream(
        &args.old_snapshot,
        &args.new_snapshot,
        args.stream_file.as_deref(),
    )?;
    debug!("captured {} stream bytes", bytes.len());

    let old_view = FsSnapshotView::new(&args.old_snapshot);
    let new_view = FsSnapshotView::new(&args.new_snapshot);
    let options = DiffOptions {
        verify_crc: args.verify_crc,
        strict: args.strict,
        emit_metadata_only_changes: args.metadata_changes,
        ..DiffOptions::default()
    };

    let report = parse_stream(&bytes, &old_view, &new_view, &options)?;
    debug!(
        "parsed {} commands into {} changes",
        report.commands,
        report.changes.len()
    );
    Ok(report)
}
