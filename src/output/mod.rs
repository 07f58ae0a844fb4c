//! Output formatting and display system
//!
//! Tables and messages for benchmark results, in colored or plain text,
//! plus the JSON rendering of a whole report.

mod colored;
mod formatter;

pub use colored::{performance_color, ColorScheme, ColoredFormatter};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};

use crate::{
    error::{AppError, Result},
    models::{BenchmarkReport, LatencySample},
    types::Mirror,
};
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Catalogue entry as printed by `mirrors --json`
#[derive(Serialize)]
struct MirrorEntry<'a> {
    name: &'a str,
    url: &'a str,
    host: Option<String>,
}

/// Pretty-printed JSON document for a benchmark report
pub fn report_to_json(report: &BenchmarkReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(AppError::from)
}

/// Pretty-printed JSON array for the mirror catalogue
pub fn mirrors_to_json(mirrors: &[Mirror]) -> Result<String> {
    let entries: Vec<MirrorEntry<'_>> = mirrors
        .iter()
        .map(|m| MirrorEntry {
            name: &m.name,
            url: &m.url,
            host: m.host().ok(),
        })
        .collect();
    serde_json::to_string_pretty(&entries).map_err(AppError::from)
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json: bool,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>, json: bool) -> Self {
        Self { formatter, json }
    }

    /// The underlying formatter
    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Latency stage output; empty in JSON mode, where the report is printed at the end
    pub fn display_latency(&self, samples: &[LatencySample]) -> Result<String> {
        if self.json {
            return Ok(String::new());
        }

        let mut output = self.formatter.format_header("Mirror latency")?;
        output.push('\n');
        output.push_str(&self.formatter.format_latency_table(samples)?);
        Ok(output)
    }

    /// Output once the run is over: the JSON report, or the download summary
    pub fn display_summary(&self, report: &BenchmarkReport) -> Result<String> {
        if self.json {
            report_to_json(report)
        } else {
            self.formatter.format_summary(report)
        }
    }

    /// The mirror catalogue
    pub fn display_mirrors(&self, mirrors: &[Mirror]) -> Result<String> {
        if self.json {
            mirrors_to_json(mirrors)
        } else {
            self.formatter.format_mirror_list(mirrors)
        }
    }
}
