//! churnviz: renders the churn chart battery for one CSV file
//!
//! This is the main entrypoint that orchestrates loading, augmentation
//! and chart generation.

use anyhow::Result;
use churnviz::{Args, ReportGenerator};
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    println!("=== Churn Report ===\n");
    let start_time = Instant::now();

    let config = args.report_config();
    let mut generator = ReportGenerator::new(config)?;

    // Load, augment and render every chart
    let summary = generator.run(&args.input);
    let Some(table) = generator.table() else {
        anyhow::bail!("could not load dataset from {}", args.input);
    };
    println!("✓ Data loaded: {} rows, {} columns", table.height(), table.width());

    println!("\n=== Report Complete ===");
    println!("Charts written: {}", summary.written.len());
    for failure in &summary.failures {
        println!("  ✗ {} ({:?}): {}", failure.filename, failure.kind, failure.message);
    }
    println!("Output directory: {}", generator.config().save_dir.display());
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::{Builder, Env};
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::from_env(Env::default().default_filter_or(level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
