//! `dbrun select`: build (and optionally run) a SELECT from JSON.

use std::fmt::Write;

use db_runner::config::Config;
use db_runner::db::{self, ExecutorOptions};
use db_runner::dialect::Dialect;
use db_runner::error::{Result, RunnerError};
use db_runner::query::{build_count, build_select, BuiltQuery, SelectToolInput, SelectionSpec};
use db_runner::runner::{ExecutionOrchestrator, ExecutionRequest};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::output::{batch_json, render_batch, to_json};
use super::{require_connection, resolve_connection, Report};
use crate::cli::{ConnectionArgs, OutputFormat};

pub struct SelectOptions {
    pub dialect: Option<Dialect>,
    pub tool: bool,
    pub count: bool,
    pub execute: bool,
    pub format: OutputFormat,
}

/// Parses a selection, either as a grid spec or as `select` tool arguments.
fn parse_selection(input: &str, tool: bool) -> Result<SelectionSpec> {
    if tool {
        let args: SelectToolInput = serde_json::from_str(input)
            .map_err(|e| RunnerError::query(format!("Invalid select tool arguments: {e}")))?;
        Ok(args.into())
    } else {
        serde_json::from_str(input)
            .map_err(|e| RunnerError::query(format!("Invalid selection: {e}")))
    }
}

/// Builds the query; grid specs without a limit get the configured page size.
fn build(mut spec: SelectionSpec, options: &SelectOptions, dialect: Dialect, page_limit: u64) -> Result<BuiltQuery> {
    if options.count {
        return Ok(build_count(&spec, dialect)?);
    }
    if spec.limit.is_none() {
        spec.limit = Some(page_limit);
    }
    Ok(build_select(&spec, dialect)?)
}

fn render_query(query: &BuiltQuery, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(query),
        OutputFormat::Text => {
            let mut out = format!("{}\n", query.sql);
            if !query.params.is_empty() {
                let _ = writeln!(out, "-- params: {:?}", query.params);
            }
            Ok(out)
        }
    }
}

pub async fn handle(
    input: &str,
    options: &SelectOptions,
    connection: &ConnectionArgs,
    config: &Config,
) -> Result<Report> {
    let spec = parse_selection(input, options.tool)?;

    if !options.execute {
        let dialect = match options.dialect {
            Some(d) => d,
            None => match resolve_connection(connection, config)? {
                Some(conn) => conn.dialect()?,
                None => config.runner.default_dialect,
            },
        };
        let query = build(spec, options, dialect, config.runner.page_limit)?;
        return Ok(Report::ok(render_query(&query, options.format)?));
    }

    let conn = require_connection(connection, config)?;
    let conn_dialect = conn.dialect()?;
    if let Some(requested) = options.dialect.filter(|d| *d != conn_dialect) {
        return Err(RunnerError::config(format!(
            "Cannot run {requested} SQL on a {conn_dialect} connection"
        )));
    }

    let query = build(spec, options, conn_dialect, config.runner.page_limit)?;
    info!("Executing built query on {}", conn.display_string());

    let executor = db::connect(&conn, ExecutorOptions::from(&config.runner)).await?;
    let request = ExecutionRequest::from_query(query, conn_dialect);
    let batch = ExecutionOrchestrator::new(executor.as_ref())
        .run_batch(&request, &CancellationToken::new())
        .await;
    executor.close().await?;

    let failed = batch.results.iter().any(|r| !r.is_success());
    let text = match options.format {
        OutputFormat::Json => batch_json(&batch)?,
        OutputFormat::Text => render_batch(&batch),
    };
    Ok(Report { text, failed })
}
