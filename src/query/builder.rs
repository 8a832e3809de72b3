//! SELECT composition for grid, quick-select and AI tool requests.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::filter::{
    compile_limit_offset, compile_order_by, compile_where, Filter, FilterConcat, OrderSpec,
    SqlFragment,
};

/// MSSQL pagination requires an ORDER BY; this one imposes no ordering.
const MSSQL_NEUTRAL_ORDER: &str = "ORDER BY (SELECT NULL)";

/// What to read from a table.
///
/// Accepts both snake_case keys and the camelCase keys sent by the grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionSpec {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, alias = "filtersConcatOperator")]
    pub filters_concat_operator: FilterConcat,
    #[serde(default, alias = "orderBy")]
    pub order_by: OrderSpec,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    /// Columns to project, in order. Empty means every column.
    #[serde(default)]
    pub select: Vec<String>,
}

impl SelectionSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A complete statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Builds `SELECT <cols> FROM <table> [WHERE] [ORDER BY] [pagination]`.
pub fn build_select(spec: &SelectionSpec, dialect: Dialect) -> Result<BuiltQuery, CompileError> {
    let columns = projection(&spec.select, dialect)?;
    let from = qualified_table(&spec.table, spec.schema.as_deref(), dialect)?;
    let filter = compile_where(&spec.filters, spec.filters_concat_operator, dialect)?;
    let mut order = compile_order_by(&spec.order_by, dialect)?;
    let page = compile_limit_offset(spec.limit, spec.offset, dialect);

    if dialect == Dialect::Mssql && order.is_empty() && !page.is_empty() {
        order = SqlFragment::new(MSSQL_NEUTRAL_ORDER, Vec::new());
    }

    Ok(assemble(
        format!("SELECT {columns} FROM {from}"),
        [filter, order, page],
    ))
}

/// Builds the `COUNT(*)` query backing grid pagination totals.
///
/// Only the table and filters of `spec` are used.
pub fn build_count(spec: &SelectionSpec, dialect: Dialect) -> Result<BuiltQuery, CompileError> {
    let from = qualified_table(&spec.table, spec.schema.as_deref(), dialect)?;
    let filter = compile_where(&spec.filters, spec.filters_concat_operator, dialect)?;

    Ok(assemble(
        format!("SELECT COUNT(*) AS total FROM {from}"),
        [filter],
    ))
}

/// Quotes and, where the dialect has schemas, qualifies a table name.
pub fn qualified_table(
    table: &str,
    schema: Option<&str>,
    dialect: Dialect,
) -> Result<String, CompileError> {
    if table.trim().is_empty() {
        return Err(CompileError::EmptyIdentifier("table"));
    }

    let table = dialect.quote_identifier(table);
    match schema.filter(|s| !s.trim().is_empty()) {
        Some(schema) if dialect.supports_schemas() => {
            Ok(format!("{}.{table}", dialect.quote_identifier(schema)))
        }
        _ => Ok(table),
    }
}

fn projection(select: &[String], dialect: Dialect) -> Result<String, CompileError> {
    if select.is_empty() {
        return Ok("*".to_string());
    }

    let mut columns = Vec::with_capacity(select.len());
    for column in select {
        if column.trim().is_empty() {
            return Err(CompileError::EmptyIdentifier("column"));
        }
        columns.push(dialect.quote_identifier(column));
    }
    Ok(columns.join(", "))
}

fn assemble<const N: usize>(head: String, fragments: [SqlFragment; N]) -> BuiltQuery {
    let mut sql = head;
    let mut params = Vec::new();
    for fragment in fragments {
        if fragment.is_empty() {
            continue;
        }
        sql.push(' ');
        sql.push_str(&fragment.sql);
        params.extend(fragment.params);
    }
    BuiltQuery { sql, params }
}
