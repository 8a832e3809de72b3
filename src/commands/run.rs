//! `dbrun run`: execute a buffer as a batch.

use std::io::{IsTerminal, Write};

use db_runner::config::Config;
use db_runner::db::{self, ExecutorOptions};
use db_runner::dialect::Dialect;
use db_runner::error::{Result, RunnerError};
use db_runner::runner::{ExecutionOrchestrator, ExecutionRequest};
use db_runner::safety;
use db_runner::segment::{select_lines, Segmenter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::output::{batch_json, render_batch};
use super::{require_connection, Report};
use crate::cli::{ConnectionArgs, OutputFormat};

pub struct RunOptions {
    /// Restrict the batch to blocks touching these lines; empty runs all.
    pub lines: Vec<usize>,
    pub yes: bool,
    /// False when the buffer itself came from stdin.
    pub can_prompt: bool,
    pub format: OutputFormat,
}

fn build_request(buffer: &str, dialect: Dialect, lines: &[usize]) -> ExecutionRequest {
    let statements = Segmenter::new(dialect.segmenter_options()).segment(buffer);
    if lines.is_empty() {
        ExecutionRequest::new(dialect, statements)
    } else {
        ExecutionRequest::new(dialect, select_lines(&statements, lines))
    }
}

/// Asks before running dangerous statements unless `--yes` was given.
fn confirm(request: &ExecutionRequest, options: &RunOptions) -> Result<()> {
    if options.yes || !request.requires_confirmation() {
        return Ok(());
    }

    let dangerous = request.dangerous_statements();
    for stmt in &dangerous {
        eprintln!(
            "lines {}-{} [{}]: {}",
            stmt.start_line,
            stmt.end_line,
            safety::matched_keywords(&stmt.text).join(", "),
            stmt.text
        );
    }

    if !options.can_prompt || !std::io::stdin().is_terminal() {
        return Err(RunnerError::query(format!(
            "{} dangerous statement(s) need confirmation; re-run with --yes",
            dangerous.len()
        )));
    }

    eprint!("Run {} dangerous statement(s)? [y/N] ", dangerous.len());
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;

    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(RunnerError::query("Batch not confirmed; nothing was executed")),
    }
}

/// Cancels the batch on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling batch");
            cancel.cancel();
        }
    })
}

pub async fn handle(
    buffer: &str,
    options: &RunOptions,
    connection: &ConnectionArgs,
    config: &Config,
) -> Result<Report> {
    let conn = require_connection(connection, config)?;
    let dialect = conn.dialect()?;

    let request = build_request(buffer, dialect, &options.lines);
    if request.is_empty() {
        return Ok(Report::ok("No statements to run\n"));
    }
    confirm(&request, options)?;

    info!(
        "Running {} statement(s) on {}",
        request.len(),
        conn.display_string()
    );
    let executor = db::connect(&conn, ExecutorOptions::from(&config.runner)).await?;

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_handler(cancel.clone());
    let batch = ExecutionOrchestrator::new(executor.as_ref())
        .run_batch(&request, &cancel)
        .await;
    interrupt.abort();
    executor.close().await?;

    let failed = batch.results.iter().any(|r| !r.is_success());
    let text = match options.format {
        OutputFormat::Json => batch_json(&batch)?,
        OutputFormat::Text => render_batch(&batch),
    };
    Ok(Report { text, failed })
}
