//! StubDB CLI
//!
//! Command-line tools for StubDB.
//!
//! # Commands
//!
//! - `replay` - Replay a JSON request script against a fresh datastore
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// StubDB command-line tools.
#[derive(Parser)]
#[command(name = "stubdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON request script against a fresh datastore
    Replay {
        /// Path to the script (a JSON array of steps)
        script: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Stop at the first failing step
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            script,
            format,
            stop_on_error,
        } => {
            commands::replay::run(&script, &format, stop_on_error)?;
        }
        Commands::Version => {
            println!("StubDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("StubDB Core v{}", stubdb_core::VERSION);
        }
    }

    Ok(())
}
