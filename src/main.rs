//! Codvis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod scene;

#[derive(Parser)]
#[command(name = "codvis")]
#[command(about = "Force-directed layout of hierarchical code models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a model and write the resulting positions as JSON
    Layout {
        /// Model description (JSON)
        model: PathBuf,

        /// Simulation config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of simulation ticks, overriding the config
        #[arg(short, long)]
        ticks: Option<usize>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the flattened node order of a model
    Inspect {
        /// Model description (JSON)
        model: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "codvis={log_level},codvis_core={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Layout {
            model,
            config,
            ticks,
            output,
        } => commands::layout(&model, config.as_deref(), ticks, output.as_deref()),
        Commands::Inspect { model } => commands::inspect(&model),
        Commands::Version => {
            println!("Codvis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
