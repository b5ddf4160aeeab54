use std::collections::BTreeMap;
use std::io::{self, Write};

use btrdiff_engine::{ChangeAction, FileChange};
use btrdiff_runtime::TABLE_ROW_LIMIT;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON array of changes.
    #[default]
    Json,
    /// Counts by action and by command.
    Summary,
    /// Aligned rows, truncated after a fixed count.
    Table,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(OutputFormat::Json),
            "summary" => Some(OutputFormat::Summary),
            "table" => Some(OutputFormat::Table),
            _ => None,
        }
    }
}

/// Color handling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Automatically detect TTY and enable colors if appropriate.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Configuration for printing change lists.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub color: ColorChoice,
    /// Maximum rows the table formatter prints.
    pub limit: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            limit: TABLE_ROW_LIMIT,
        }
    }
}

/// Static context about a print run.
#[derive(Debug)]
pub struct PrintContext {
    /// Total number of changes.
    pub total: usize,
    /// Irregularities tolerated while parsing.
    pub diagnostics: usize,
}

/// Trait for printing a change list.
///
/// Implementations receive the rows one by one between `begin` and
/// `finish`, and are responsible for formatting and output.
pub trait ChangePrinter {
    /// Called once before any rows.
    fn begin(&mut self, ctx: &PrintContext) -> io::Result<()>;

    /// Called for each change, in output order.
    fn row(&mut self, change: &FileChange, ctx: &PrintContext) -> io::Result<()>;

    /// Called once after all rows.
    fn finish(&mut self, ctx: &PrintContext) -> io::Result<()>;
}

/// Emits the whole list as one pretty-printed JSON document, the shape
/// downstream tooling consumes.
pub struct JsonPrinter<W: Write> {
    out: W,
    rows: Vec<FileChange>,
}

impl JsonPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        JsonPrinter::new(io::stdout())
    }
}

impl<W: Write> JsonPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: Vec::new(),
        }
    }
}

impl<W: Write> ChangePrinter for JsonPrinter<W> {
    fn begin(&mut self, _ctx: &PrintContext) -> io::Result<()> {
        Ok(())
    }

    fn row(&mut self, change: &FileChange, _ctx: &PrintContext) -> io::Result<()> {
        self.rows.push(change.clone());
        Ok(())
    }

    fn finish(&mut self, _ctx: &PrintContext) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, &self.rows).map_err(io::Error::other)?;
        writeln!(self.out)
    }
}

/// Counts by action and by originating command.
pub struct SummaryPrinter<W: Write> {
    out: W,
    by_action: BTreeMap<&'static str, usize>,
    by_command: BTreeMap<&'static str, usize>,
}

impl SummaryPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        SummaryPrinter::new(io::stdout())
    }
}

impl<W: Write> SummaryPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            by_action: BTreeMap::new(),
            by_command: BTreeMap::new(),
        }
    }
}

impl<W: Write> ChangePrinter for SummaryPrinter<W> {
    fn begin(&mut self, _ctx: &PrintContext) -> io::Result<()> {
        Ok(())
    }

    fn row(&mut self, change: &FileChange, _ctx: &PrintContext) -> io::Result<()> {
        *self.by_action.entry(change.action.name()).or_default() += 1;
        *self
            .by_command
            .entry(change.details.command.name())
            .or_default() += 1;
        Ok(())
    }

    fn finish(&mut self, ctx: &PrintContext) -> io::Result<()> {
        writeln!(self.out, "Summary of {} changes:", ctx.total)?;
        for action in ["modified", "deleted", "renamed"] {
            let count = self.by_action.get(action).copied().unwrap_or(0);
            writeln!(self.out, "  {action}: {count}")?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "By command type:")?;
        let mut commands: Vec<(&str, usize)> =
            self.by_command.iter().map(|(k, v)| (*k, *v)).collect();
        commands.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (command, count) in commands {
            writeln!(self.out, "  {command}: {count}")?;
        }

        if ctx.diagnostics > 0 {
            writeln!(self.out)?;
            writeln!(
                self.out,
                "Stream irregularities tolerated: {}",
                ctx.diagnostics
            )?;
        }

        Ok(())
    }
}

/// Aligned rows with a detail column; stops after `limit` rows and
/// reports the remainder.
pub struct TablePrinter<W: Write> {
    out: W,
    cfg: PrinterConfig,
    use_color: bool,
    printed: usize,
}

impl TablePrinter<io::Stdout> {
    pub fn stdout(cfg: PrinterConfig) -> Self {
        use std::io::IsTerminal;

        let use_color = match cfg.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        };

        TablePrinter {
            out: io::stdout(),
            cfg,
            use_color,
            printed: 0,
        }
    }
}

impl<W: Write> TablePrinter<W> {
    pub fn new(out: W, cfg: PrinterConfig, use_color: bool) -> Self {
        Self {
            out,
            cfg,
            use_color,
            printed: 0,
        }
    }

    fn format_action(&self, action: ChangeAction) -> String {
        if !self.use_color {
            return action.name().to_owned();
        }
        let code = match action {
            ChangeAction::Deleted => "31",
            ChangeAction::Renamed => "36",
            ChangeAction::Modified => "32",
        };
        format!("\x1b[{code}m{}\x1b[0m", action.name())
    }
}

fn detail_column(change: &FileChange) -> String {
    if let Some(to) = &change.details.path_to {
        format!("-> {to}")
    } else if let Some(target) = &change.details.path_link {
        format!("-> {target}")
    } else if let Some(size) = change.details.size {
        format!("size: {size}")
    } else {
        String::new()
    }
}

fn truncate_path(path: &str) -> String {
    if path.chars().count() > 60 {
        let cut: String = path.chars().take(60).collect();
        format!("{cut}...")
    } else {
        path.to_owned()
    }
}

impl<W: Write> ChangePrinter for TablePrinter<W> {
    fn begin(&mut self, _ctx: &PrintContext) -> io::Result<()> {
        writeln!(
            self.out,
            "{:<10} {:<62} {:<14} {}",
            "ACTION", "PATH", "COMMAND", "DETAILS"
        )
    }

    fn row(&mut self, change: &FileChange, _ctx: &PrintContext) -> io::Result<()> {
        if self.printed >= self.cfg.limit {
            return Ok(());
        }
        self.printed += 1;

        // The colored cell is padded by hand: escape codes inflate the
        // byte length format! pads against.
        let action = self.format_action(change.action);
        let pad = 10usize.saturating_sub(change.action.name().len());
        writeln!(
            self.out,
            "{}{} {:<62} {:<14} {}",
            action,
            " ".repeat(pad),
            truncate_path(&change.path.to_lossy_string()),
            change.details.command.name(),
            detail_column(change),
        )
    }

    fn finish(&mut self, ctx: &PrintContext) -> io::Result<()> {
        if ctx.total > self.printed {
            writeln!(self.out, "... and {} more changes", ctx.total - self.printed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
