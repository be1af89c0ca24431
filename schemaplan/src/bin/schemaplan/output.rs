use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use schemaplan::{Plan, RiskLevel};
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// JSON output for scripting and executors (default)
    #[default]
    Json,
    /// Formatted table output for review
    Table,
    /// Compact one-line-per-step output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Trait for data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display.
///
/// Payloads (plans, hashes) go to stdout; every human-facing message goes to
/// stderr so stdout stays machine-readable.
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format.
    ///
    /// Payloads are printed even in quiet mode; quiet only silences messages.
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        println!("{}", self.render(data)?);
        Ok(())
    }

    pub fn render<T>(&self, data: &T) -> Result<String>
    where
        T: Serialize + TableDisplay,
    {
        Ok(match self.options.output_format {
            OutputFormat::Json => serde_json::to_string_pretty(data)?,
            OutputFormat::Table => data.to_table(&self.options).to_string(),
            OutputFormat::Compact => data.to_compact(),
        })
    }

    /// Print a bare value (e.g., a hash) on stdout.
    pub fn raw(&self, value: &str) {
        println!("{value}");
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        self.message(ICONS.success, THEME.success, message);
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    /// Display a warning message
    pub fn warning(&self, message: &str) {
        self.message(ICONS.warning, THEME.warning, message);
    }

    /// Display info message with color and icon
    pub fn info(&self, message: &str) {
        self.message(ICONS.info, THEME.info, message);
    }

    /// Display verbose information (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.options.verbose {
            self.message(ICONS.arrow, THEME.muted, message);
        }
    }

    /// Display a bullet list item
    pub fn bullet(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("  {} {text}", ICONS.bullet)
            } else {
                format!("  {} {text}", ICONS.bullet.color(THEME.muted))
            };
            eprintln!("{output}");
        }
    }

    /// Display a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            eprintln!("{output}");
        }
    }

    fn message(&self, icon: &str, color: colored::Color, message: &str) {
        if self.options.quiet {
            return;
        }
        let output = if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        };
        eprintln!("{output}");
    }
}

fn create_table(options: &GlobalOptions) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }
    table
}

fn header_cells(options: &GlobalOptions, headers: &[&str]) -> Vec<Cell> {
    headers
        .iter()
        .map(|h| {
            let cell = Cell::new(h).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect()
}

fn risk_cell(options: &GlobalOptions, risk: Option<RiskLevel>) -> Cell {
    let Some(risk) = risk else {
        return Cell::new("-");
    };
    let cell = Cell::new(risk.as_str());
    if options.no_color {
        return cell;
    }
    match risk {
        RiskLevel::None => cell.fg(TableColor::DarkGrey),
        RiskLevel::Low => cell.fg(TableColor::Green),
        RiskLevel::Medium => cell.fg(TableColor::Cyan),
        RiskLevel::High => cell.fg(TableColor::Yellow),
        RiskLevel::Destructive => cell.fg(TableColor::Red).add_attribute(Attribute::Bold),
    }
}

impl TableDisplay for Plan {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        table.set_header(header_cells(options, &["#", "Kind", "Risk", "Target", "Notes"]));

        if self.steps.is_empty() {
            table.add_row(vec![Cell::new("-"), Cell::new("No changes")]);
        }

        for (i, step) in self.steps.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(step.kind.as_str()),
                risk_cell(options, step.risk),
                Cell::new(step.target.as_deref().unwrap_or("")),
                Cell::new(step.notes.as_deref().unwrap_or("")),
            ]);
        }

        let summary = self
            .risk_summary
            .iter()
            .map(|(risk, count)| format!("{risk}={count}"))
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![
            Cell::new(""),
            Cell::new("SUMMARY").add_attribute(Attribute::Bold),
            Cell::new(""),
            Cell::new(summary),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        let mut lines: Vec<String> = self
            .steps
            .iter()
            .map(|step| {
                format!(
                    "{} {} {}",
                    step.kind,
                    step.risk.map(|r| r.as_str()).unwrap_or("-"),
                    step.target.as_deref().unwrap_or("")
                )
                .trim_end()
                .to_string()
            })
            .collect();
        lines.push(format!(
            "{} -> {} ({} step(s))",
            self.from_hash,
            self.to_hash,
            self.steps.len()
        ));
        lines.join("\n")
    }
}
