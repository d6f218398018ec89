//! arbor CLI - Command-line interface for the arbor tree engine
//!
//! This binary provides a harness for exercising the engine on its fixture
//! trees: printing, flat export, and scoring throughput.

mod config;

use anyhow::{Context, Result};
use arbor_engine::predict::benchmark_throughput;
use arbor_engine::test_tree::{build_test_tree, build_test_tree_categorical, test_dataset};
use arbor_engine::{CategorySplit, DecisionTree, FlatTree};
use clap::{ArgAction, Parser, Subcommand};
use config::Settings;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

#[derive(Parser, Debug)]
#[command(name = "arbor", version, about = "Decision tree node engine harness")]
struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Multiplier applied to predictions on export and scoring
    #[arg(long, env = "ARBOR_SHRINKAGE", global = true)]
    shrinkage: Option<f64>,

    /// Leaves reached by fewer rows are adjusted after growth
    #[arg(long, env = "ARBOR_MIN_OBS", global = true)]
    min_obs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a fixture tree
    Show {
        /// Use the tree with a categorical split
        #[arg(long)]
        categorical: bool,
    },
    /// Flatten a fixture tree to JSON
    Export {
        #[arg(long)]
        categorical: bool,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a throughput benchmark
    Bench {
        #[command(subcommand)]
        target: BenchTarget,
    },
}

#[derive(Subcommand, Debug)]
enum BenchTarget {
    /// Parallel scoring of the categorical fixture tree
    Predict {
        #[arg(default_value_t = 1_000_000)]
        rows: usize,
    },
}

#[derive(Serialize)]
struct Export<'a> {
    tree: &'a FlatTree,
    categories: &'a [CategorySplit],
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?.with_overrides(cli.shrinkage, cli.min_obs);
    tracing::info!(?settings, "resolved settings");

    match &cli.command {
        Commands::Show { categorical } => {
            let tree = fixture(*categorical, &settings);
            print!("{tree}");

            let mut influence = vec![0.0; 3];
            tree.accumulate_influence(&mut influence);
            println!();
            println!("Relative influence:");
            for (var, value) in influence.iter().enumerate() {
                println!("  V{var}: {value}");
            }
        }
        Commands::Export { categorical, out } => {
            let tree = fixture(*categorical, &settings);
            let (flat, categories) = tree.to_flat(&test_dataset(), settings.shrinkage);
            let json = serde_json::to_string_pretty(&Export {
                tree: &flat,
                categories: &categories,
            })
            .context("Failed to encode flat tree")?;
            match out {
                Some(path) => fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Bench {
            target: BenchTarget::Predict { rows },
        } => {
            println!("Running tree scoring benchmark...");
            println!("Sample size: {} rows", rows);
            let (rows_per_sec, duration_ms) = benchmark_throughput(*rows, settings.shrinkage);

            println!("Results:");
            println!("  Duration: {} ms", duration_ms);
            println!("  Throughput: {:.2} rows/sec", rows_per_sec);
            println!("  Throughput: {:.2}M rows/sec", rows_per_sec / 1_000_000.0);
        }
    }
    Ok(())
}

/// Fixture tree with the configured adjustment applied
fn fixture(categorical: bool, settings: &Settings) -> DecisionTree {
    let mut tree = if categorical {
        build_test_tree_categorical()
    } else {
        build_test_tree()
    };
    tree.adjust(settings.min_obs, &*settings.policy());
    tree
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}
