use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    params,
    progress::{Clock, LogProgress, SystemClock, format_elapsed},
    report::{RunReport, render_skipped, render_text},
    scan::{ScanConfig, ScanSummary, Scanner},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Tally genotype counts across DTC genotype files, grouped by cohort", long_about = None)]
struct Cli {
    /// Tab-separated parameter file (DIR, RSID, FILES:<label>:<priority>, ...)
    #[arg(value_name = "PARAMS")]
    params: Option<PathBuf>,

    /// Directory holding the genotype files (overrides DIR)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Variant id glob, e.g. rs104* (overrides RSID)
    #[arg(long, value_name = "GLOB")]
    rsid: Option<String>,

    /// Write a JSON run report with all counts to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let clock = SystemClock::start();
    let config = build_config(&cli)?;

    let mut observer = LogProgress;
    let output = Scanner::new(&config, &clock, &mut observer)
        .run()
        .with_context(|| format!("failed to scan {}", config.directory.display()))?;

    print!("{}", render_text(&output.results));
    print_summary(&output.summary);

    if let Some(path) = &cli.json {
        RunReport::new(&config, &output)
            .write(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    println!();
    println!("Elapsed: {}", format_elapsed(clock.elapsed()));
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ScanConfig> {
    let mut config = match &cli.params {
        Some(path) => params::load(path)
            .with_context(|| format!("failed to load parameters from {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if let Some(dir) = &cli.dir {
        config.directory = dir.clone();
    }
    if let Some(rsid) = &cli.rsid {
        config.selection = config
            .selection
            .with_variant_id(rsid)
            .with_context(|| format!("invalid --rsid pattern '{rsid}'"))?;
    }
    Ok(config)
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!();
    println!(
        "Scanned {files} files; read {read} lines, counted {processed}.",
        files = summary.files.len(),
        read = summary.lines_read(),
        processed = summary.lines_processed(),
    );

    if summary.parse_errors() > 0 {
        println!(
            "Ignored {count} malformed input lines.",
            count = summary.parse_errors()
        );
    }

    let skipped = render_skipped(&summary.skipped);
    if !skipped.is_empty() {
        println!();
        println!("Skipped Files");
        print!("{skipped}");
    }
}
