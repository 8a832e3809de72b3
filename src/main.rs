//! dbrun - split, check, build and run SQL editor buffers.

mod cli;
mod commands;

use cli::Cli;
use db_runner::config::Config;
use db_runner::error::Result;
use db_runner::logging;
use tracing::{debug, error};

/// Exit code when the runner worked but a statement failed.
const EXIT_STATEMENT_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_STATEMENT_FAILED),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            if cli.log_file {
                eprintln!("{}: {}", e.category(), e);
            }
            std::process::exit(1);
        }
    }
}

/// Returns false if any executed statement failed.
async fn run(cli: &Cli) -> Result<bool> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let report = commands::dispatch(&cli.command, &config).await?;
    print!("{}", report.text);
    Ok(!report.failed)
}
