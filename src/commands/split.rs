//! `dbrun split`: statements or query blocks of a buffer.

use std::fmt::Write;

use db_runner::dialect::Dialect;
use db_runner::error::Result;
use db_runner::segment::{blocks, Segmenter};
use serde_json::json;

use super::output::to_json;
use super::Report;
use crate::cli::OutputFormat;

pub fn handle(buffer: &str, dialect: Dialect, as_blocks: bool, format: OutputFormat) -> Result<Report> {
    let segmentation = Segmenter::new(dialect.segmenter_options()).segment_with_diagnostics(buffer);
    let statements = &segmentation.statements;
    let unterminated = segmentation.unterminated.as_ref().map(ToString::to_string);

    let text = match (format, as_blocks) {
        (OutputFormat::Json, false) => to_json(&json!({
            "statements": statements,
            "unterminated": unterminated,
        }))?,
        (OutputFormat::Json, true) => to_json(&json!({
            "blocks": blocks(statements),
            "unterminated": unterminated,
        }))?,
        (OutputFormat::Text, false) => {
            let mut out = String::new();
            for stmt in statements {
                let _ = writeln!(out, "[{}-{}] {}", stmt.start_line, stmt.end_line, stmt.text);
            }
            out
        }
        (OutputFormat::Text, true) => {
            let mut out = String::new();
            for block in blocks(statements) {
                let _ = writeln!(out, "[{}-{}]", block.start_line, block.end_line);
                for text in &block.statements {
                    let _ = writeln!(out, "  {text}");
                }
            }
            out
        }
    };

    Ok(Report::ok(text))
}
