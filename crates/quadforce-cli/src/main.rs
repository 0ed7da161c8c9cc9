//! quadforce CLI - run force-directed layouts from the command line.
//!
//! Loads or generates a graph, runs it to stability and reports the result.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod graph;

use commands::layout::GraphSource;
use config::Config;

/// quadforce CLI - Barnes-Hut force-directed graph layout.
#[derive(Parser, Debug)]
#[command(
    name = "qf",
    author,
    version,
    about = "quadforce: run force-directed graph layouts",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// JSON config file with layout tunables and run settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out a graph until it stabilizes or times out.
    ///
    /// Reads the graph from `--input`, or generates a seeded random one.
    Layout {
        /// Graph JSON file: { "nodes": [[x,y,z]], "edges": [[a,b]], "pinned": [i] }.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Node count of the generated graph (ignored with --input).
        #[arg(long, default_value_t = 100)]
        nodes: usize,

        /// Edge count of the generated graph (ignored with --input).
        #[arg(long, default_value_t = 200)]
        edges: usize,

        /// Seed of the generated graph.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Iterations per update tick (overrides config and QF_ITERATIONS_PER_UPDATE).
        #[arg(long)]
        iterations_per_update: Option<usize>,

        /// Timeout in seconds (overrides config and QF_TIMEOUT_SECS).
        #[arg(long)]
        timeout: Option<f64>,

        /// Write final positions and statistics to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity; RUST_LOG takes precedence.
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Layout {
            input,
            nodes,
            edges,
            seed,
            iterations_per_update,
            timeout,
            output,
        } => {
            if let Some(iterations) = iterations_per_update {
                config.iterations_per_update = iterations;
            }
            if let Some(secs) = timeout {
                config.timeout_secs = secs;
            }

            let source = match input {
                Some(path) => GraphSource::File(path),
                None => GraphSource::Random { nodes, edges, seed },
            };

            let report = commands::layout::execute(&config, &source, output.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Config => {
            commands::config::show(&config)?;
        }
    }

    Ok(())
}
