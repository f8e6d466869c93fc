//! # chatprep CLI
//!
//! Command-line interface for the chatprep library.

use std::fs;
use std::io::{self, Write};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatprep::cli::{Args, ReportFormat};
use chatprep::pipeline::{ImportOutcome, ImportPipeline};
use chatprep::progress::stderr_progress;
use chatprep::value::Value;
use chatprep::{ImportError, Result};

fn main() {
    init_tracing();
    let args = <Args as ClapParser>::parse();
    let start = Instant::now();

    let outcome = match import(&args) {
        Ok(outcome) => outcome,
        Err(e) => {
            report_rejection(&args, &e);
            process::exit(1);
        }
    };

    if let Err(e) = write_output(args.output.as_deref(), &outcome.document.text) {
        eprintln!("❌ Error: Could not write output: {}", e);
        process::exit(1);
    }

    report(&args, &outcome, start.elapsed());
}

/// Logs go to stderr, filtered by `RUST_LOG` (default: warn).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn import(args: &Args) -> Result<ImportOutcome> {
    let mut pipeline = ImportPipeline::with_config(args.to_config());
    if args.progress {
        pipeline = pipeline.with_progress(stderr_progress());
    }

    if args.reads_stdin() {
        pipeline.normalize_reader(io::stdin().lock(), None)
    } else {
        pipeline.normalize_path(&args.input)
    }
}

fn write_output(path: Option<&str>, text: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, text),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}

fn report(args: &Args, outcome: &ImportOutcome, elapsed: Duration) {
    match args.report {
        ReportFormat::Json => print_json(&outcome.summary()),
        ReportFormat::Text => print_text(args, outcome, elapsed),
    }
}

fn print_text(args: &Args, outcome: &ImportOutcome, elapsed: Duration) {
    let doc = &outcome.document;

    eprintln!("📦 chatprep v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("📂 Input:     {}", args.input);
    match &outcome.archive_entry {
        Some(entry) => eprintln!("🗜️  Container: {} ({})", doc.source_container, entry),
        None => eprintln!("🗂️  Container: {}", doc.source_container),
    }
    eprintln!("🔤 Encoding:  {} ({})", doc.encoding_used, doc.quality);
    if let Some(layout) = outcome.signals.layout {
        eprintln!("🧭 Layout:    {}", layout);
    }
    if let Some(ts) = outcome.signals.first_timestamp {
        eprintln!("📅 First:     {}", ts.format("%Y-%m-%d %H:%M"));
    }
    eprintln!("📄 Lines:     {}", doc.line_count());
    if let Some(path) = &args.output {
        eprintln!("💾 Output:    {}", path);
    }
    eprintln!();

    match outcome.warning() {
        Some(reason) => eprintln!("⚠️  Accepted with warning: {}", reason),
        None => eprintln!("✅ Accepted"),
    }
    if doc.is_degraded() {
        eprintln!("⚠️  Text is {}; some characters may be wrong", doc.quality);
    }
    eprintln!("⚡ Done in {:.2}s", elapsed.as_secs_f64());
}

fn report_rejection(args: &Args, err: &ImportError) {
    match args.report {
        ReportFormat::Json => print_json(&Value::map([
            ("stage", Value::from("rejected")),
            ("verdict", Value::from("rejected")),
            ("error", Value::from(err.kind())),
            ("reason", Value::from(err.to_string())),
            ("retryable", Value::from(err.is_retryable())),
        ])),
        ReportFormat::Text => eprintln!("❌ Error: {}", err),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => eprintln!("❌ Error: Could not serialize report: {}", e),
    }
}
