//! Subcommand handlers for `dbrun`.
//!
//! Handlers return a rendered [`Report`] instead of printing so they can be
//! tested without capturing stdout.

mod check;
mod operators;
mod output;
mod run;
mod select;
mod split;

use std::io::Read;
use std::path::Path;

use db_runner::config::{Config, ConnectionConfig};
use db_runner::error::{Result, RunnerError};
use tracing::debug;

use crate::cli::{self, Command, ConnectionArgs};

/// Rendered command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    /// Set when at least one statement failed or was cancelled.
    pub failed: bool,
}

impl Report {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failed: false,
        }
    }
}

/// Runs one subcommand.
pub async fn dispatch(command: &Command, config: &Config) -> Result<Report> {
    match command {
        Command::Split {
            file,
            dialect,
            blocks,
            format,
        } => {
            let buffer = read_input(file.as_deref())?;
            let dialect = dialect.unwrap_or(config.runner.default_dialect);
            split::handle(&buffer, dialect, *blocks, *format)
        }
        Command::Check {
            file,
            dialect,
            format,
        } => {
            let buffer = read_input(file.as_deref())?;
            let dialect = dialect.unwrap_or(config.runner.default_dialect);
            check::handle(&buffer, dialect, *format)
        }
        Command::Select {
            spec,
            dialect,
            tool,
            count,
            execute,
            connection,
            format,
        } => {
            let input = read_input(Some(spec.as_path()))?;
            let options = select::SelectOptions {
                dialect: *dialect,
                tool: *tool,
                count: *count,
                execute: *execute,
                format: *format,
            };
            select::handle(&input, &options, connection, config).await
        }
        Command::Run {
            file,
            connection,
            lines,
            yes,
            format,
        } => {
            let reads_stdin = cli::input_path(file.as_deref()).is_none();
            let buffer = read_input(file.as_deref())?;
            let options = run::RunOptions {
                lines: lines.clone(),
                yes: *yes,
                can_prompt: !reads_stdin,
                format: *format,
            };
            run::handle(&buffer, &options, connection, config).await
        }
        Command::Operators { dialect } => Ok(operators::handle(
            dialect.unwrap_or(config.runner.default_dialect),
        )),
    }
}

/// Reads a file, or stdin when the path is absent or `-`.
fn read_input(file: Option<&Path>) -> Result<String> {
    match cli::input_path(file) {
        Some(path) => {
            debug!("Reading {}", path.display());
            std::fs::read_to_string(path).map_err(|e| {
                RunnerError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {e}", path.display()),
                ))
            })
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Resolves the connection to use.
///
/// Precedence: named connection (`-c`), then `--url` / `DATABASE_URL`,
/// then the config file's `default` connection.
fn resolve_connection(args: &ConnectionArgs, config: &Config) -> Result<Option<ConnectionConfig>> {
    if let Some(name) = args.connection.as_deref() {
        return match config.get_connection(Some(name)) {
            Some(conn) => Ok(Some(conn.clone())),
            None => Err(RunnerError::config(format!(
                "Connection '{name}' not found in config file"
            ))),
        };
    }

    if let Some(url) = args.url.as_deref() {
        return ConnectionConfig::from_url(url).map(Some);
    }

    Ok(config.get_connection(None).cloned())
}

/// Like [`resolve_connection`], but a connection is mandatory.
fn require_connection(args: &ConnectionArgs, config: &Config) -> Result<ConnectionConfig> {
    resolve_connection(args, config)?.ok_or_else(|| {
        RunnerError::config(
            "No database connection configured. Use --url, --connection, or a [connections.default] entry",
        )
    })
}
