//! Text and JSON rendering shared by the subcommands.

use std::fmt::Write;

use db_runner::db::Row;
use db_runner::error::{Result, RunnerError};
use db_runner::runner::{summarize, BatchRun, BatchStatus, ExecutionResult, Outcome};
use serde::Serialize;
use serde_json::{json, Value};

/// Pretty-printed JSON followed by a newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)
        .map_err(|e| RunnerError::internal(format!("Failed to serialize output: {e}")))?;
    out.push('\n');
    Ok(out)
}

/// Renders a left-aligned table with a header rule.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Cell text for a JSON value; strings print unquoted and null prints as `NULL`.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders result rows as a table, columns taken from the first row.
pub fn render_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    render_table(&headers, &cells)
}

fn render_result(out: &mut String, result: &ExecutionResult) {
    let stmt = &result.statement;
    let _ = writeln!(out, "-- lines {}-{}: {}", stmt.start_line, stmt.end_line, stmt.text);
    let millis = result.duration.as_secs_f64() * 1000.0;
    match &result.outcome {
        Outcome::Succeeded(rows) => {
            out.push_str(&render_rows(rows));
            let _ = writeln!(out, "({} row(s), {millis:.1} ms)", rows.len());
        }
        Outcome::Failed(e) if e.is_cancelled() => {
            let _ = writeln!(out, "{e} ({millis:.1} ms)");
        }
        Outcome::Failed(e) => {
            let _ = writeln!(out, "ERROR: {e} ({millis:.1} ms)");
        }
    }
    out.push('\n');
}

/// Renders a finished batch: each result, then the summary line and notice.
pub fn render_batch(run: &BatchRun) -> String {
    let mut out = String::new();
    for result in &run.results {
        render_result(&mut out, result);
    }

    let summary = summarize(&run.results);
    let _ = write!(
        out,
        "{} statement(s): {} succeeded, {} failed",
        summary.total, summary.success_count, summary.failure_count
    );
    if summary.cancelled_count > 0 {
        let _ = write!(out, " ({} cancelled)", summary.cancelled_count);
    }
    if run.status == BatchStatus::Cancelled {
        out.push_str("; batch cancelled");
    }
    out.push('\n');

    if let Some(notice) = summary.notice() {
        let _ = writeln!(out, "{notice}");
    }
    out
}

/// JSON document for a finished batch.
pub fn batch_json(run: &BatchRun) -> Result<String> {
    let summary = summarize(&run.results);
    to_json(&json!({
        "status": run.status,
        "results": run.results,
        "summary": summary,
        "notice": summary.notice(),
    }))
}
