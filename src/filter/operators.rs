//! Operator registry.
//!
//! Operator ids are the contract shared by the grid UI, the AI tool layer
//! and the compiler. Adding an operator means adding a variant, its id and
//! arity, and one arm group in [`template`].

use std::fmt;

use serde::Serialize;

use crate::dialect::Dialect;

/// Number of values an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    None,
    One,
    Two,
    AtLeastOne,
}

impl Arity {
    /// Returns true if `count` values satisfy this arity.
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::None => count == 0,
            Self::One => count == 1,
            Self::Two => count == 2,
            Self::AtLeastOne => count >= 1,
        }
    }

    /// Human-readable expectation, used in arity errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::None => "0",
            Self::One => "1",
            Self::Two => "2",
            Self::AtLeastOne => "at least 1",
        }
    }
}

/// Filter operators understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Like,
    NotLike,
    Ilike,
    NotIlike,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl OperatorId {
    pub const ALL: [OperatorId; 20] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Like,
        Self::NotLike,
        Self::Ilike,
        Self::NotIlike,
        Self::IsNull,
        Self::IsNotNull,
        Self::In,
        Self::NotIn,
        Self::Between,
        Self::NotBetween,
    ];

    /// Stable string id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::Ilike => "ilike",
            Self::NotIlike => "not_ilike",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::NotBetween => "not_between",
        }
    }

    /// Looks up an operator by its id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == id)
    }

    /// Display label shown next to the id in operator pickers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Ilike => "like (case-insensitive)",
            Self::NotIlike => "not like (case-insensitive)",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Between => "between",
            Self::NotBetween => "not between",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull => Arity::None,
            Self::In | Self::NotIn => Arity::AtLeastOne,
            Self::Between | Self::NotBetween => Arity::Two,
            _ => Arity::One,
        }
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL template for an operator in a dialect.
///
/// Slots: `{col}` quoted column, `{v}` single value, `{v1}`/`{v2}` range
/// bounds, `{list}` comma-separated value list.
pub fn template(op: OperatorId, dialect: Dialect) -> &'static str {
    use Dialect::{Clickhouse, Mssql, Mysql, Postgres, Sqlite};
    use OperatorId::*;

    match (op, dialect) {
        (Eq, _) => "{col} = {v}",
        (Neq, _) => "{col} <> {v}",
        (Gt, _) => "{col} > {v}",
        (Gte, _) => "{col} >= {v}",
        (Lt, _) => "{col} < {v}",
        (Lte, _) => "{col} <= {v}",

        (Contains, Postgres | Sqlite) => "{col} LIKE ('%' || {v} || '%')",
        (Contains, Mysql | Clickhouse) => "{col} LIKE CONCAT('%', {v}, '%')",
        (Contains, Mssql) => "{col} LIKE ('%' + {v} + '%')",

        (NotContains, Postgres | Sqlite) => "{col} NOT LIKE ('%' || {v} || '%')",
        (NotContains, Mysql | Clickhouse) => "{col} NOT LIKE CONCAT('%', {v}, '%')",
        (NotContains, Mssql) => "{col} NOT LIKE ('%' + {v} + '%')",

        (StartsWith, Postgres | Sqlite) => "{col} LIKE ({v} || '%')",
        (StartsWith, Mysql | Clickhouse) => "{col} LIKE CONCAT({v}, '%')",
        (StartsWith, Mssql) => "{col} LIKE ({v} + '%')",

        (EndsWith, Postgres | Sqlite) => "{col} LIKE ('%' || {v})",
        (EndsWith, Mysql | Clickhouse) => "{col} LIKE CONCAT('%', {v})",
        (EndsWith, Mssql) => "{col} LIKE ('%' + {v})",

        (Like, _) => "{col} LIKE {v}",
        (NotLike, _) => "{col} NOT LIKE {v}",

        (Ilike, Postgres | Clickhouse) => "{col} ILIKE {v}",
        (Ilike, Mysql | Mssql | Sqlite) => "LOWER({col}) LIKE LOWER({v})",
        (NotIlike, Postgres | Clickhouse) => "{col} NOT ILIKE {v}",
        (NotIlike, Mysql | Mssql | Sqlite) => "LOWER({col}) NOT LIKE LOWER({v})",

        (IsNull, _) => "{col} IS NULL",
        (IsNotNull, _) => "{col} IS NOT NULL",

        (In, _) => "{col} IN ({list})",
        (NotIn, _) => "{col} NOT IN ({list})",

        (Between, _) => "{col} BETWEEN {v1} AND {v2}",
        (NotBetween, _) => "{col} NOT BETWEEN {v1} AND {v2}",
    }
}
