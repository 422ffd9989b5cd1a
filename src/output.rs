//! CLI output formatting and the machine-readable processing report.
//!
//! # Information-First Display
//!
//! The primary display for every entry is its semantic identity — positional
//! index, name, terminal status — with sizes, dimensions, and savings shown
//! as indented context lines:
//!
//! ```text
//! 001 sunset.jpg — completed
//!     Source: 2.4 MB 4000x3000 jpeg
//!     webp: 312 KB 1600x1200 q80 (-87.3%)
//!     avif: 198 KB 1600x1200 q80 (-91.9%)
//! 002 broken.png — error
//!     Source: 1.1 KB
//!     Error: decode failed: ...
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects. The [`Report`] types are
//! the JSON twin of the same information for scripting consumers.

use crate::formats::FormatTag;
use crate::store::{ImageEntry, Status, compression_ratio};
use serde::Serialize;

/// Human-readable byte count: B/KB/MB/GB, two decimals, trailing zeros
/// trimmed.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = (bytes as f64).log(1024.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

fn format_index(pos: usize) -> String {
    format!("{pos:0>3}")
}

/// Format one entry as its display block: header plus indented context.
pub fn format_entry(index: usize, entry: &ImageEntry) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {} — {}",
        format_index(index),
        entry.name,
        entry.status
    ));

    let mut source = format!("    Source: {}", format_bytes(entry.original_size));
    if entry.original_width > 0 {
        source.push_str(&format!(
            " {}x{}",
            entry.original_width, entry.original_height
        ));
    }
    if let Some(format) = entry.source_format {
        source.push_str(&format!(" {format}"));
    }
    lines.push(source);

    for result in entry.results.iter() {
        let ratio = compression_ratio(entry.original_size, result.size);
        let mut line = format!(
            "    {}: {} {}x{}",
            result.format,
            format_bytes(result.size),
            result.width,
            result.height
        );
        if result.format != FormatTag::Original {
            line.push_str(&format!(" q{} ({:+.1}%)", result.quality.value(), -ratio));
        }
        if !result.within_budget {
            line.push_str(" [over budget]");
        }
        lines.push(line);
    }

    if let Some(error) = &entry.error {
        lines.push(format!("    Error: {error}"));
    }

    lines
}

/// Format the full result listing plus a summary line.
pub fn format_results(entries: &[ImageEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.extend(format_entry(i + 1, entry));
    }

    let completed = entries
        .iter()
        .filter(|e| e.status == Status::Completed)
        .count();
    let failed = entries.iter().filter(|e| e.status == Status::Error).count();
    lines.push(String::new());
    lines.push(format!(
        "Processed {} images: {} completed, {} failed",
        entries.len(),
        completed,
        failed
    ));
    lines
}

pub fn print_results(entries: &[ImageEntry]) {
    for line in format_results(entries) {
        println!("{line}");
    }
}

// ============================================================================
// JSON report
// ============================================================================

/// Machine-readable twin of the CLI listing.
#[derive(Debug, Serialize)]
pub struct Report {
    pub images: Vec<ImageReport>,
}

#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub id: String,
    pub name: String,
    pub status: String,
    pub original_size: u64,
    pub original_width: u32,
    pub original_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<FormatTag>,
    pub results: Vec<ResultReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultReport {
    pub format: FormatTag,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    pub within_budget: bool,
    /// Percentage saved relative to the original.
    pub savings: f64,
}

pub fn build_report(entries: &[ImageEntry]) -> Report {
    Report {
        images: entries
            .iter()
            .map(|entry| ImageReport {
                id: entry.id().to_string(),
                name: entry.name.clone(),
                status: entry.status.to_string(),
                original_size: entry.original_size,
                original_width: entry.original_width,
                original_height: entry.original_height,
                source_format: entry.source_format,
                results: entry
                    .results
                    .iter()
                    .map(|r| ResultReport {
                        format: r.format,
                        size: r.size,
                        width: r.width,
                        height: r.height,
                        quality: r.quality.value(),
                        within_budget: r.within_budget,
                        savings: compression_ratio(entry.original_size, r.size),
                    })
                    .collect(),
                error: entry.error.clone(),
            })
            .collect(),
    }
}
