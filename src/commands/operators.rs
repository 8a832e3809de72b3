//! `dbrun operators`: the filter operator table for one dialect.

use db_runner::dialect::Dialect;
use db_runner::filter::operators::template;
use db_runner::filter::OperatorId;

use super::output::render_table;
use super::Report;

pub fn handle(dialect: Dialect) -> Report {
    let headers = ["id", "label", "values", "sql"].map(String::from);
    let rows: Vec<Vec<String>> = OperatorId::ALL
        .iter()
        .map(|op| {
            vec![
                op.as_str().to_string(),
                op.label().to_string(),
                op.arity().describe().to_string(),
                template(*op, dialect).to_string(),
            ]
        })
        .collect();
    Report::ok(format!("{dialect}\n{}", render_table(&headers, &rows)))
}
