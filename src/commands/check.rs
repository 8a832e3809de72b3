//! `dbrun check`: dangerous keywords per statement.

use std::fmt::Write;

use db_runner::dialect::Dialect;
use db_runner::error::Result;
use db_runner::safety::Assessment;
use db_runner::segment::{Segmenter, Statement};
use serde::Serialize;

use super::output::to_json;
use super::Report;
use crate::cli::OutputFormat;

#[derive(Serialize)]
struct Checked<'a> {
    #[serde(flatten)]
    statement: &'a Statement,
    #[serde(flatten)]
    assessment: Assessment,
}

pub fn handle(buffer: &str, dialect: Dialect, format: OutputFormat) -> Result<Report> {
    let statements = Segmenter::new(dialect.segmenter_options()).segment(buffer);
    let checked: Vec<Checked<'_>> = statements
        .iter()
        .map(|statement| Checked {
            statement,
            assessment: Assessment::of(&statement.text),
        })
        .collect();

    let text = match format {
        OutputFormat::Json => to_json(&checked)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for c in &checked {
                let verdict = if c.assessment.dangerous {
                    format!("DANGEROUS ({})", c.assessment.keywords.join(", "))
                } else {
                    "ok".to_string()
                };
                let _ = writeln!(
                    out,
                    "[{}-{}] {verdict}: {}",
                    c.statement.start_line, c.statement.end_line, c.statement.text
                );
            }
            let dangerous = checked.iter().filter(|c| c.assessment.dangerous).count();
            let _ = writeln!(out, "{dangerous} of {} statement(s) need confirmation", checked.len());
            out
        }
    };

    Ok(Report::ok(text))
}
