//! Output helpers shared across commands.

use anyhow::{Context, Result};
use clap::ValueEnum;
use pv_core::Diagnostics;
use serde::Serialize;
use std::io::{self, Write};
use tabwriter::TabWriter;

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned key/value table (default for interactive use)
    #[default]
    Table,
    /// Pretty-printed JSON (pipe-friendly, structured)
    Json,
}

/// Write a value as pretty JSON followed by a newline.
pub fn write_json<T: Serialize, W: Write>(value: &T, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("serializing output to JSON")?;
    writeln!(writer)?;
    Ok(())
}

/// Key/value rows rendered through a tab-aligned writer.
#[derive(Default)]
pub struct Report {
    rows: Vec<(String, String)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.rows.push((key.to_string(), value.to_string()));
        self
    }

    /// Blank line followed by a section heading
    pub fn section(&mut self, title: &str) -> &mut Self {
        self.rows.push((String::new(), String::new()));
        self.rows.push((title.to_uppercase(), String::new()));
        self
    }

    pub fn diagnostics(&mut self, diagnostics: &Diagnostics) -> &mut Self {
        self.section("diagnostics");
        if diagnostics.issues.is_empty() {
            self.row("status", "No issues");
        }
        for issue in &diagnostics.issues {
            self.row(&format!("{:?}", issue.severity).to_lowercase(), issue.to_string());
        }
        self
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut tw = TabWriter::new(writer);
        for (key, value) in &self.rows {
            if value.is_empty() {
                writeln!(tw, "{key}")?;
            } else {
                writeln!(tw, "{key}\t{value}")?;
            }
        }
        tw.flush()?;
        Ok(())
    }
}

/// Render `value` as JSON or as the table built by `table`.
pub fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    table: impl FnOnce(&mut Report),
) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Json => write_json(value, &mut handle),
        OutputFormat::Table => {
            let mut report = Report::new();
            table(&mut report);
            report.write_to(handle)
        }
    }
}
