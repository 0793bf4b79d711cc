//! mgrep - recursive regular-expression search
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use mgrep::concurrency::Done;
use mgrep::config::{CliArgs, SearchConfig};
use mgrep::sink::WriterSink;
use mgrep::source::FsSource;
use mgrep::summary::print_summary;
use std::io::{self, BufWriter};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status when nothing matched
const EXIT_NO_MATCH: u8 = 1;

/// Exit status on error
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NO_MATCH),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the search; returns whether anything matched
fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = SearchConfig::from_args(args).context("Invalid configuration")?;

    let done = Done::new();

    // Setup signal handler for graceful shutdown
    let interrupt = done.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        interrupt.cancel();
    })
    .context("Failed to set signal handler")?;

    let deadline = config
        .timeout
        .map(|timeout| done.cancel_after(timeout))
        .transpose()
        .context("Failed to start deadline timer")?;

    let searcher = config.build_searcher(FsSource::new());

    let stdout = io::stdout();
    let highlight = config.highlight && console::colors_enabled();
    let mut sink = WriterSink::new(BufWriter::new(stdout.lock())).with_highlight(highlight);

    let stats = searcher
        .search(&config.root, &config.pattern, &done, &mut sink)
        .with_context(|| format!("Search of '{}' failed", config.root.display()))?;
    drop(deadline);

    match sink.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            return Err(e).context("Failed to flush output");
        }
        _ => {}
    }
    drop(sink);

    if config.show_stats {
        print_summary(&config.root, config.concurrency, &stats);
    }

    if !stats.completed {
        info!("Search was interrupted before completion");
    }

    Ok(stats.matches > 0)
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("mgrep=debug,warn")
    } else {
        EnvFilter::new("mgrep=info,warn")
    };

    // Matches go to stdout; logs must not mix with them
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
