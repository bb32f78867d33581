//! docbridge CLI - documentation link-graph transformer.
//!
//! Provides commands for:
//! - `init`: Create the store and its root category
//! - `clean`: Normalize a Doxygen directory into cleaned HTML
//! - `import`: Import generated HTML into the store
//! - `export`: Export the store as a Markdown tree
//! - `convert`: Convert HTML to Markdown without a store

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CleanArgs, ConvertArgs, ExportArgs, ImportArgs, InitArgs};
use output::Output;

/// docbridge - Doxygen HTML to CMS to Markdown.
#[derive(Parser)]
#[command(name = "docbridge", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover docbridge.toml).
    #[arg(short, long, global = true, env = "DOCBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (per-phase progress logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store schema and the root category.
    Init(InitArgs),
    /// Normalize a Doxygen HTML directory into cleaned pages and an index.
    Clean(CleanArgs),
    /// Import an HTML directory into the store.
    Import(ImportArgs),
    /// Export the store as a Markdown tree.
    Export(ExportArgs),
    /// Convert an HTML file or directory to Markdown without the store.
    Convert(ConvertArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init(args) => args.execute(config),
        Commands::Clean(args) => args.execute(config),
        Commands::Import(args) => args.execute(config),
        Commands::Export(args) => args.execute(config),
        Commands::Convert(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
