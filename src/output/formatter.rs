//! The formatter trait, table layout helpers and the plain-text formatter
//! used for pipes, logs and `--no-color`.

use crate::{
    error::{AppError, Result},
    models::{BenchmarkReport, LatencySample, MirrorRanking, ThroughputSample},
    types::Mirror,
};
use std::fmt::Write as _;

/// Cell text for a measurement that was not taken
pub const UNTESTED: &str = "untested";

/// Renders every piece of text output; `Err` only if writing into a `String` fails
pub trait OutputFormatter {
    /// Title framed by `=` rules
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format latency probe results as a table
    fn format_latency_table(&self, samples: &[LatencySample]) -> Result<String>;

    /// Format the merged latency and download ranking as a table
    fn format_final_table(&self, ranking: &[MirrorRanking]) -> Result<String>;

    /// Format the selected mirror
    fn format_best(&self, best: Option<&Mirror>) -> Result<String>;

    /// Format the mirror catalogue
    fn format_mirror_list(&self, mirrors: &[Mirror]) -> Result<String>;

    /// Format the outcome of one download test
    fn format_throughput(&self, sample: &ThroughputSample) -> Result<String>;

    /// Format informational messages
    fn format_info(&self, message: &str) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;

    fn format_success(&self, message: &str) -> Result<String>;

    /// Format everything after the latency stage: final table, timings and best mirror
    fn format_summary(&self, report: &BenchmarkReport) -> Result<String> {
        let mut output = String::new();

        if report.download_skipped {
            writeln!(output, "{}", self.format_info("Download test skipped")?).map_err(write_error)?;
        } else if !report.ranking.is_empty() {
            writeln!(output, "{}", self.format_header("Download results")?).map_err(write_error)?;
            writeln!(output, "{}", self.format_final_table(&report.ranking)?).map_err(write_error)?;
        } else if report.reachable().next().is_some() {
            writeln!(output, "{}", self.format_warning("Every download test failed")?).map_err(write_error)?;
        }

        writeln!(
            output,
            "{}",
            self.format_info(&format!(
                "Latency stage {:.2} ms, total {:.2} ms",
                report.latency_stage_ms, report.total_ms
            ))?
        )
        .map_err(write_error)?;
        write!(output, "{}", self.format_best(report.best.as_ref())?).map_err(write_error)?;

        Ok(output)
    }
}

pub(crate) fn write_error(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show unreachable mirrors and error details
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
        }
    }
}

/// Columns plus border and header switches
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
}

#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Maximum width; longer cells are cut
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            max_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Cells of one table row, already formatted
pub type RowData = Vec<String>;

impl TableFormat {
    /// Latency table: name, latency and URL
    pub fn latency(show_borders: bool) -> Self {
        Self {
            columns: vec![
                Column::new("Mirror", Alignment::Left),
                Column::new("Latency (ms)", Alignment::Right),
                Column::new("URL", Alignment::Left),
            ],
            show_borders,
            show_header: true,
        }
    }

    /// Final table: name, latency, download speed and URL
    pub fn ranking(show_borders: bool) -> Self {
        Self {
            columns: vec![
                Column::new("Mirror", Alignment::Left),
                Column::new("Latency (ms)", Alignment::Right),
                Column::new("Speed (MB/s)", Alignment::Right),
                Column::new("URL", Alignment::Left),
            ],
            show_borders,
            show_header: true,
        }
    }

    /// Render rows; `paint` receives (row index, column index, padded cell) for data cells
    pub fn render<F>(&self, rows: &[RowData], paint: F) -> String
    where
        F: Fn(usize, usize, String) -> String,
    {
        if rows.is_empty() {
            return String::new();
        }

        let column_widths = self.calculate_column_widths(rows);
        let mut output = String::new();

        if self.show_header && !self.columns.is_empty() {
            if self.show_borders {
                output.push_str(&create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, |_, cell| cell));
            output.push('\n');

            if self.show_borders {
                output.push_str(&create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        for (row_idx, row) in rows.iter().enumerate() {
            output.push_str(&self.create_row(row, &column_widths, |col_idx, cell| paint(row_idx, col_idx, cell)));
            output.push('\n');
        }

        if self.show_borders {
            output.push_str(&create_horizontal_border(&column_widths));
        } else {
            output.pop();
        }

        output
    }

    fn calculate_column_widths(&self, rows: &[RowData]) -> Vec<usize> {
        let num_columns = self.columns.len().max(rows.iter().map(|r| r.len()).max().unwrap_or(0));

        (0..num_columns)
            .map(|col_idx| {
                let column = self.columns.get(col_idx);
                let mut width = column.map(|c| display_width(&c.header)).unwrap_or(0);
                for row in rows {
                    if let Some(cell) = row.get(col_idx) {
                        width = width.max(display_width(cell));
                    }
                }
                match column {
                    Some(c) => width.min(c.max_width),
                    None => width,
                }
            })
            .collect()
    }

    fn create_row<F>(&self, data: &[String], widths: &[usize], paint: F) -> String
    where
        F: Fn(usize, String) -> String,
    {
        let mut row = String::new();

        if self.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = self.columns.get(idx).map(|c| c.alignment).unwrap_or(Alignment::Left);
            let padded_cell = paint(idx, align_text(cell, width, alignment));

            if self.show_borders {
                row.push(' ');
            }
            row.push_str(&padded_cell);
            if self.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }
}

fn create_horizontal_border(widths: &[usize]) -> String {
    let mut border = String::new();

    if !widths.is_empty() {
        border.push('+');
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
    }

    border
}

fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Pad or cut `text` to exactly `width` characters
pub(crate) fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = display_width(text);
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

/// Milliseconds with two decimals, or the untested marker
pub(crate) fn format_ms(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| UNTESTED.to_string())
}

/// Rows of the latency table; unreachable mirrors only in verbose mode
pub(crate) fn latency_rows(samples: &[LatencySample], verbose: bool) -> Vec<RowData> {
    samples
        .iter()
        .filter(|s| verbose || s.is_successful())
        .map(|s| vec![s.mirror.name.clone(), format_ms(s.latency_ms), s.mirror.url.clone()])
        .collect()
}

pub(crate) fn ranking_rows(ranking: &[MirrorRanking]) -> Vec<RowData> {
    ranking
        .iter()
        .map(|r| vec![r.name.clone(), format_ms(r.latency_ms), format_ms(r.speed_mbps), r.url.clone()])
        .collect()
}

/// ASCII tables and `ERROR:`/`WARNING:` prefixes, no escape codes
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(display_width(title) + 4);

        writeln!(output, "{}", border).map_err(write_error)?;
        writeln!(output, "  {}", title).map_err(write_error)?;
        write!(output, "{}", border).map_err(write_error)?;

        Ok(output)
    }

    fn format_latency_table(&self, samples: &[LatencySample]) -> Result<String> {
        let rows = latency_rows(samples, self.options.verbose_mode);
        if rows.is_empty() {
            return Ok("No mirror answered the latency probe.".to_string());
        }

        let mut output = TableFormat::latency(self.options.table_borders).render(&rows, |_, _, cell| cell);

        if self.options.verbose_mode {
            for sample in samples.iter().filter(|s| !s.is_successful()) {
                let reason = sample.error_message.as_deref().unwrap_or("no response");
                write!(output, "\n{}: {}", sample.mirror.name, reason).map_err(write_error)?;
            }
        }

        Ok(output)
    }

    fn format_final_table(&self, ranking: &[MirrorRanking]) -> Result<String> {
        Ok(TableFormat::ranking(self.options.table_borders).render(&ranking_rows(ranking), |_, _, cell| cell))
    }

    fn format_best(&self, best: Option<&Mirror>) -> Result<String> {
        Ok(match best {
            Some(mirror) => format!("Best mirror: {} ({})", mirror.name, mirror.url),
            None => "No reachable mirror".to_string(),
        })
    }

    fn format_mirror_list(&self, mirrors: &[Mirror]) -> Result<String> {
        let format = TableFormat {
            columns: vec![Column::new("Mirror", Alignment::Left), Column::new("URL", Alignment::Left)],
            show_borders: self.options.table_borders,
            show_header: true,
        };
        let rows: Vec<RowData> = mirrors.iter().map(|m| vec![m.name.clone(), m.url.clone()]).collect();
        Ok(format.render(&rows, |_, _, cell| cell))
    }

    fn format_throughput(&self, sample: &ThroughputSample) -> Result<String> {
        Ok(match sample.speed_mbps {
            Some(speed) => format!(
                "{}: {:.2} MB/s ({:.2} MB in {:.2}s)",
                sample.mirror.name,
                speed,
                sample.megabytes(),
                sample.elapsed_secs
            ),
            None => format!(
                "{}: download test failed: {}",
                sample.mirror.name,
                sample.error_message.as_deref().unwrap_or("unknown error")
            ),
        })
    }

    fn format_info(&self, message: &str) -> Result<String> {
        Ok(message.to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
