mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use recollect::{Config, Error, MemoryService};

use commands::Commands;
use output::{ErrorResponse, print_json};

/// recollect - local-first semantic memory
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database file (overrides config and environment)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("recollect=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recollect=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let mut config = Config::load()?;
    if let Some(path) = &cli.database {
        config.database_path = recollect::config::expand_tilde(path);
    }
    let mut service = MemoryService::new(config);
    let code = commands::execute(&cli.command, &mut service, cli.json)?;
    service.shutdown();
    Ok(code)
}

/// Exit status for a failed command: 3 for storage failures (database
/// open, I/O or SQL), 1 for everything else. 2 is reserved for
/// "not found" answers from `delete`.
fn failure_status(error: &Error) -> u8 {
    if error.is_storage() { 3 } else { 1 }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                print_json(&ErrorResponse {
                    error: e.to_string(),
                });
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(failure_status(&e))
        }
    }
}
