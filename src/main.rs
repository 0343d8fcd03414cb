//! Binary entry point for annex.
//!
//! This binary provides the CLI interface for building and querying saved
//! vector indexes.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use annex::cli::{BuildCommand, InfoCommand, QueryCommand, ThresholdCommand};
use annex::config::AnnexConfig;
use annex::observability;
use annex::BackendType;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Annex - build, query and inspect approximate-nearest-neighbor indexes.
#[derive(Parser)]
#[command(name = "annex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build an index from a `.npy` file and save it.
    Build {
        /// Backend variant: `mutable_graph` or `static_graph`.
        #[arg(short, long)]
        backend: BackendType,

        /// `.npy` file with one vector per row.
        #[arg(long)]
        vectors: PathBuf,

        /// Output directory.
        #[arg(short, long)]
        out: PathBuf,

        /// Declared capacity (mutable graph only; defaults to the row count).
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// k-nearest-neighbor search.
    Query {
        /// Saved index directory.
        #[arg(short, long)]
        index: PathBuf,

        /// Backend variant the index was saved as.
        #[arg(short, long)]
        backend: BackendType,

        /// `.npy` file with the query vectors.
        #[arg(long)]
        vectors: PathBuf,

        /// Neighbors per query vector.
        #[arg(short, default_value = "10")]
        k: usize,
    },

    /// All neighbors strictly closer than a distance.
    Threshold {
        /// Saved index directory.
        #[arg(short, long)]
        index: PathBuf,

        /// Backend variant the index was saved as.
        #[arg(short, long)]
        backend: BackendType,

        /// `.npy` file with the query vectors.
        #[arg(long)]
        vectors: PathBuf,

        /// Exclusive distance bound.
        #[arg(short, long)]
        distance: f32,

        /// Neighbors fetched before filtering (overrides the config).
        #[arg(long)]
        overfetch: Option<usize>,
    },

    /// Describe a saved index.
    Info {
        /// Saved index directory.
        #[arg(short, long)]
        index: PathBuf,

        /// Backend variant the index was saved as.
        #[arg(short, long)]
        backend: BackendType,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let logging = config.logging.clone().verbose(cli.verbose);
    if let Err(e) = observability::init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &AnnexConfig) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match command {
        Commands::Build {
            backend,
            vectors,
            out,
            capacity,
        } => {
            let context = format!("building {backend} index into {}", out.display());
            BuildCommand {
                backend,
                vectors,
                out,
                capacity,
            }
            .run(config, &mut handle)
            .context(context)
        },

        Commands::Query {
            index,
            backend,
            vectors,
            k,
        } => {
            let context = format!("querying {}", index.display());
            QueryCommand {
                index,
                backend,
                vectors,
                k,
            }
            .run(&mut handle)
            .context(context)
        },

        Commands::Threshold {
            index,
            backend,
            vectors,
            distance,
            overfetch,
        } => {
            let context = format!("threshold query on {}", index.display());
            ThresholdCommand {
                index,
                backend,
                vectors,
                distance,
                overfetch,
            }
            .run(config, &mut handle)
            .context(context)
        },

        Commands::Info { index, backend } => {
            let context = format!("describing {}", index.display());
            InfoCommand { index, backend }
                .run(&mut handle)
                .context(context)
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>) -> anyhow::Result<AnnexConfig> {
    let config = match path {
        Some(path) => AnnexConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => AnnexConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}
