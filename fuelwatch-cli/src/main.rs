//! fuelwatch CLI - Command-line interface
//!
//! Reads engine telemetry lines from stdin, a file, or an upstream command
//! and prints running fuel consumption reports to stdout.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::FormatArg;
use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fuelwatch", version, about = "Fuel consumption meter for engine telemetry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Meter fuel consumption from a telemetry stream
    Run {
        /// Read telemetry from a file instead of stdin
        #[arg(long, conflicts_with = "command")]
        file: Option<PathBuf>,

        /// Spawn an upstream command and read its stdout (e.g. "submsg pentad")
        #[arg(long)]
        command: Option<String>,

        /// Case-insensitive token marking relevant lines
        #[arg(long)]
        marker: Option<String>,

        /// Label of the flow-rate field
        #[arg(long)]
        field: Option<String>,

        /// Report output format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Backward clock step tolerated without a regression, in milliseconds
        #[arg(long)]
        tolerance_ms: Option<u64>,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Run {
            file,
            command,
            marker,
            field,
            format,
            tolerance_ms,
            verbose,
        } => commands::run::run(RunArgs {
            file,
            command,
            marker,
            field,
            format,
            tolerance_ms,
            verbose,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
