//! Ledgerline command line.
//!
//! - `run`: process one file landed in local object storage and print the response
//! - `check`: compile a schema document and report every configuration error
//! - `parse`: preview how a local file splits into segment tables

use clap::{Parser, Subcommand};
use ledgerline_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

use cli::ConfigArgs;

#[derive(Parser, Debug)]
#[command(name = "ledgerline", about = "Fixed-width batch file transformer", version)]
struct Cli {
    /// Enable debug logging for every Ledgerline crate
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LEDGERLINE_LOG_JSON")]
    log_json: bool,

    /// Also write a daily-rolling log file in this directory
    #[arg(long, global = true, env = "LEDGERLINE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one file and print the JSON response
    Run(cli::run::RunArgs),

    /// Load and compile the schema document
    Check(cli::check::CheckArgs),

    /// Parse a local file with the schema entry its name resolves to
    Parse(cli::parse::ParseArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "ledgerline",
        verbose: cli.verbose,
        json: cli.log_json,
        log_dir: cli.log_dir.clone(),
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: logging disabled: {:#}", err);
            None
        }
    };

    let result = match &cli.command {
        Commands::Run(args) => cli::run::run(&cli.config, args),
        Commands::Check(args) => cli::check::run(&cli.config, args),
        Commands::Parse(args) => cli::parse::run(&cli.config, args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}
