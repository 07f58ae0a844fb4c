//! Colored formatter implementation with terminal color support
//!
//! Same layout as the plain formatter; cells are painted after padding so
//! the ANSI escapes never disturb column widths.

use super::formatter::{
    latency_rows, ranking_rows, write_error, Alignment, Column, FormattingOptions, OutputFormatter, RowData,
    TableFormat, UNTESTED,
};
use crate::{
    error::Result,
    models::{LatencySample, MirrorRanking, ThroughputSample},
    types::{Mirror, PerformanceLevel},
};
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Color for a latency class
pub fn performance_color(level: PerformanceLevel) -> Color {
    match level {
        PerformanceLevel::Good => Color::Green,
        PerformanceLevel::Moderate => Color::Yellow,
        PerformanceLevel::Poor => Color::Red,
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Bold and colored, if colors are enabled
    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(color)
        } else {
            text.normal()
        }
    }

    /// Paint a padded millisecond cell by its latency class
    fn paint_latency(&self, cell: String) -> String {
        match cell.trim().parse::<f64>() {
            Ok(ms) => self.colorize(&cell, performance_color(PerformanceLevel::from_latency_ms(ms))).to_string(),
            Err(_) if cell.trim() == UNTESTED => self.colorize(&cell, self.color_scheme.muted).to_string(),
            Err(_) => cell,
        }
    }

    fn paint_name(&self, cell: String) -> String {
        self.colorize(&cell, self.color_scheme.info).to_string()
    }

    fn paint_speed(&self, cell: String, fastest: bool) -> String {
        if cell.trim() == UNTESTED {
            self.colorize(&cell, self.color_scheme.muted).to_string()
        } else if fastest {
            self.emphasize(&cell, self.color_scheme.success).to_string()
        } else {
            cell
        }
    }

    fn section_rule(&self, width: usize) -> String {
        self.colorize(&"=".repeat(width), self.color_scheme.border).to_string()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let width = title.chars().count() + 4;

        writeln!(output, "{}", self.section_rule(width)).map_err(write_error)?;
        writeln!(output, "  {}", self.emphasize(title, self.color_scheme.header)).map_err(write_error)?;
        write!(output, "{}", self.section_rule(width)).map_err(write_error)?;

        Ok(output)
    }

    fn format_latency_table(&self, samples: &[LatencySample]) -> Result<String> {
        let rows = latency_rows(samples, self.options.verbose_mode);
        if rows.is_empty() {
            return Ok(self
                .colorize("No mirror answered the latency probe.", self.color_scheme.warning)
                .to_string());
        }

        let mut output = TableFormat::latency(self.options.table_borders).render(&rows, |_, col, cell| match col {
            0 => self.paint_name(cell),
            1 => self.paint_latency(cell),
            _ => cell,
        });

        if self.options.verbose_mode {
            for sample in samples.iter().filter(|s| !s.is_successful()) {
                let reason = sample.error_message.as_deref().unwrap_or("no response");
                write!(
                    output,
                    "\n{}: {}",
                    self.colorize(&sample.mirror.name, self.color_scheme.muted),
                    self.colorize(reason, self.color_scheme.error)
                )
                .map_err(write_error)?;
            }
        }

        Ok(output)
    }

    fn format_final_table(&self, ranking: &[MirrorRanking]) -> Result<String> {
        let rows = ranking_rows(ranking);
        Ok(TableFormat::ranking(self.options.table_borders).render(&rows, |row, col, cell| match col {
            0 => self.paint_name(cell),
            1 => self.paint_latency(cell),
            2 => self.paint_speed(cell, row == 0),
            _ => cell,
        }))
    }

    fn format_best(&self, best: Option<&Mirror>) -> Result<String> {
        Ok(match best {
            Some(mirror) => format!(
                "Best mirror: {} ({})",
                self.emphasize(&mirror.name, self.color_scheme.success),
                mirror.url
            ),
            None => self.colorize("No reachable mirror", self.color_scheme.error).to_string(),
        })
    }

    fn format_mirror_list(&self, mirrors: &[Mirror]) -> Result<String> {
        let format = TableFormat {
            columns: vec![Column::new("Mirror", Alignment::Left), Column::new("URL", Alignment::Left)],
            show_borders: self.options.table_borders,
            show_header: true,
        };
        let rows: Vec<RowData> = mirrors.iter().map(|m| vec![m.name.clone(), m.url.clone()]).collect();
        Ok(format.render(&rows, |_, col, cell| if col == 0 { self.paint_name(cell) } else { cell }))
    }

    fn format_throughput(&self, sample: &ThroughputSample) -> Result<String> {
        let name = self.colorize(&sample.mirror.name, self.color_scheme.info);
        Ok(match sample.speed_mbps {
            Some(speed) => format!(
                "{}: {} ({:.2} MB in {:.2}s)",
                name,
                self.emphasize(&format!("{:.2} MB/s", speed), self.color_scheme.highlight),
                sample.megabytes(),
                sample.elapsed_secs
            ),
            None => format!(
                "{}: {}",
                name,
                self.colorize(
                    &format!(
                        "download test failed: {}",
                        sample.error_message.as_deref().unwrap_or("unknown error")
                    ),
                    self.color_scheme.error
                )
            ),
        })
    }

    fn format_info(&self, message: &str) -> Result<String> {
        Ok(self.colorize(message, self.color_scheme.info).to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("✗ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("! {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✓ {}", self.colorize(message, self.color_scheme.success)))
    }
}
