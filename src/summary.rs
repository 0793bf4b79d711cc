//! End-of-search summary
//!
//! Written to stderr so it never mixes with matches on stdout.

use crate::searcher::SearchStats;
use console::style;
use humansize::{format_size, BINARY};
use std::path::Path;

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Print a summary of the search results
pub fn print_summary(root: &Path, workers: usize, stats: &SearchStats) {
    let duration_secs = stats.duration.as_secs_f64();
    let title = if stats.completed {
        style("Search Complete").green().bold()
    } else {
        style("Search Cancelled").yellow().bold()
    };
    let mode = if workers == 0 {
        "serial".to_string()
    } else {
        format!("{} workers", workers)
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {} ({})", style("Root:").bold(), root.display(), mode);
    eprintln!("  {} {}", style("Directories:").bold(), format_number(stats.dirs));
    eprintln!(
        "  {} {} ({})",
        style("Files:").bold(),
        format_number(stats.files),
        format_size(stats.bytes, BINARY)
    );
    eprintln!("  {} {}", style("Matches:").bold(), format_number(stats.matches));
    eprintln!(
        "  {} {:.2}s ({:.0} files/sec, {}/s)",
        style("Duration:").bold(),
        duration_secs,
        stats.files_per_second(),
        format_size(stats.bytes_per_second() as u64, BINARY)
    );
    if stats.skipped > 0 {
        eprintln!("  {} {}", style("Skipped:").bold(), format_number(stats.skipped));
    }
    if stats.handoffs > 0 || stats.inline > 0 {
        eprintln!(
            "  {} {} handed off, {} inline",
            style("Subdirectories:").bold(),
            format_number(stats.handoffs),
            format_number(stats.inline)
        );
    }
    if stats.errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(stats.errors)
        );
    }
    eprintln!();
}
