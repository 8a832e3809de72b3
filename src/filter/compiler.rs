//! Fragment compilation for WHERE, ORDER BY and pagination clauses.

use crate::dialect::Dialect;
use crate::error::CompileError;

use super::operators::{template, Arity, OperatorId};
use super::{Filter, FilterConcat, OrderSpec, SqlFragment};

/// Largest row count MySQL accepts; its idiom for "no limit".
const MYSQL_UNBOUNDED_LIMIT: &str = "18446744073709551615";

/// Compiles filters into a `WHERE ...` fragment.
///
/// An empty filter list yields an empty fragment. Placeholders are numbered
/// from 1 across the whole fragment and `params` follows that order. Any
/// invalid filter fails the whole compile.
pub fn compile_where(
    filters: &[Filter],
    concat: FilterConcat,
    dialect: Dialect,
) -> Result<SqlFragment, CompileError> {
    if filters.is_empty() {
        return Ok(SqlFragment::empty());
    }

    let mut params = Vec::new();
    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        conditions.push(compile_filter(filter, dialect, &mut params)?);
    }

    let body = if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        conditions
            .iter()
            .map(|c| format!("({c})"))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", concat.as_sql()))
    };

    Ok(SqlFragment::new(format!("WHERE {body}"), params))
}

fn compile_filter(
    filter: &Filter,
    dialect: Dialect,
    params: &mut Vec<String>,
) -> Result<String, CompileError> {
    let op = OperatorId::from_id(&filter.operator.trim().to_ascii_lowercase())
        .ok_or_else(|| CompileError::InvalidOperator(filter.operator.clone()))?;

    if filter.column.trim().is_empty() {
        return Err(CompileError::EmptyIdentifier("column"));
    }

    let arity = op.arity();
    if !arity.accepts(filter.values.len()) {
        return Err(CompileError::InvalidFilterArity {
            operator: op.as_str().to_string(),
            expected: arity.describe(),
            actual: filter.values.len(),
        });
    }

    let mut slots = Vec::with_capacity(filter.values.len());
    for value in &filter.values {
        let value = match arity {
            // List values usually come from a comma-separated input box.
            Arity::AtLeastOne => value.trim().to_string(),
            _ => value.clone(),
        };
        params.push(value);
        slots.push(dialect.placeholder(params.len()));
    }

    Ok(render(
        template(op, dialect),
        &dialect.quote_identifier(&filter.column),
        &slots,
    ))
}

/// Fills template slots. The column goes in last so identifier text is
/// never rescanned for slot markers.
fn render(template: &str, column: &str, slots: &[String]) -> String {
    let mut sql = template.replace("{list}", &slots.join(", "));
    if let [first, second] = slots {
        sql = sql.replace("{v1}", first).replace("{v2}", second);
    }
    if let [only] = slots {
        sql = sql.replace("{v}", only);
    }
    sql.replace("{col}", column)
}

/// Compiles an ordering into an `ORDER BY ...` fragment.
pub fn compile_order_by(order_by: &OrderSpec, dialect: Dialect) -> Result<SqlFragment, CompileError> {
    if order_by.is_empty() {
        return Ok(SqlFragment::empty());
    }

    let mut terms = Vec::with_capacity(order_by.len());
    for (column, direction) in order_by.iter() {
        if column.trim().is_empty() {
            return Err(CompileError::EmptyIdentifier("column"));
        }
        terms.push(format!(
            "{} {}",
            dialect.quote_identifier(column),
            direction.as_sql()
        ));
    }

    Ok(SqlFragment::new(
        format!("ORDER BY {}", terms.join(", ")),
        Vec::new(),
    ))
}

/// Compiles pagination. Values are integers and are inlined.
///
/// An offset of 0 is omitted. MSSQL output assumes the statement already
/// has an ORDER BY clause.
pub fn compile_limit_offset(limit: Option<u64>, offset: Option<u64>, dialect: Dialect) -> SqlFragment {
    let offset = offset.filter(|&m| m > 0);

    let sql = match dialect {
        Dialect::Mssql => match (limit, offset) {
            (None, None) => String::new(),
            (Some(n), None) => format!("OFFSET 0 ROWS FETCH NEXT {n} ROWS ONLY"),
            (None, Some(m)) => format!("OFFSET {m} ROWS"),
            (Some(n), Some(m)) => format!("OFFSET {m} ROWS FETCH NEXT {n} ROWS ONLY"),
        },
        _ => match (limit, offset) {
            (None, None) => String::new(),
            (Some(n), None) => format!("LIMIT {n}"),
            (Some(n), Some(m)) => format!("LIMIT {n} OFFSET {m}"),
            (None, Some(m)) => match dialect {
                Dialect::Mysql => format!("LIMIT {MYSQL_UNBOUNDED_LIMIT} OFFSET {m}"),
                Dialect::Sqlite => format!("LIMIT -1 OFFSET {m}"),
                Dialect::Clickhouse => format!("OFFSET {m} ROWS"),
                _ => format!("OFFSET {m}"),
            },
        },
    };

    SqlFragment::new(sql, Vec::new())
}
