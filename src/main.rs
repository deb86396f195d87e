use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chimerge::{ChiMergeConfig, Dataset};

/// Discretize one numeric column of a CSV dataset with ChiMerge.
#[derive(Parser)]
#[command(name = "chimerge")]
#[command(about = "ChiMerge discretization of a numeric dataset column")]
#[command(version)]
struct Cli {
    /// CSV file: attribute columns followed by a class-label column
    data: PathBuf,

    /// Attribute column to discretize (zero-based)
    #[arg(long, default_value_t = 0)]
    column: usize,

    /// Interval count below which merging stops
    #[arg(long, default_value_t = 6)]
    max_interval: usize,

    /// Chi-square score above which adjacent intervals stay separate
    #[arg(long, default_value_t = 4.61)]
    chi_threshold: f64,

    /// Floor applied to small expected-frequency cells
    #[arg(long, default_value_t = 0.5)]
    expected_freq_threshold: f64,

    /// Merge every pair tied at the minimal score each round
    #[arg(long)]
    batch_merge: bool,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let contents = fs::read_to_string(&cli.data)
        .with_context(|| format!("failed to read {}", cli.data.display()))?;
    let dataset = Dataset::from_csv_str(&contents).context("failed to parse input CSV")?;
    info!(
        tuples = dataset.len(),
        classes = dataset.n_classes(),
        "dataset loaded"
    );

    let config = ChiMergeConfig::new()
        .with_max_interval(cli.max_interval)
        .with_chi_threshold(cli.chi_threshold)
        .with_expected_freq_threshold(cli.expected_freq_threshold)
        .with_batch_merge(cli.batch_merge);
    let table = dataset
        .discretize_by_chi(cli.column, config)
        .context("discretization failed")?;

    println!(
        "column {} discretized into {} intervals in {} rounds",
        cli.column,
        table.intervals().len(),
        table.rounds()
    );
    println!("classes: {}", dataset.class_list().join(", "));
    let chi = table.chi_values();
    for (index, interval) in table.intervals().iter().enumerate() {
        match chi.get(index).copied().flatten() {
            Some(score) => println!("{} chi: {:.2}", interval, score),
            None => println!("{}", interval),
        }
    }
    Ok(())
}
