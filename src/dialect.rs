//! SQL dialects supported by the runner.
//!
//! Every dialect-specific rendering decision (identifier quoting, parameter
//! placeholders, schema qualification, string escaping rules used by the
//! segmenter) hangs off this closed enum so the compiler stays exhaustive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::segment::SegmenterOptions;

/// Database engine family a statement is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    Mysql,
    Mssql,
    Clickhouse,
    Sqlite,
}

impl Dialect {
    /// All dialects, in declaration order.
    pub const ALL: [Dialect; 5] = [
        Self::Postgres,
        Self::Mysql,
        Self::Mssql,
        Self::Clickhouse,
        Self::Sqlite,
    ];

    /// Returns the dialect as its stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mssql => "mssql",
            Self::Clickhouse => "clickhouse",
            Self::Sqlite => "sqlite",
        }
    }

    /// Maps a connection URL scheme to a dialect.
    pub fn from_url_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::Mysql),
            "mssql" | "sqlserver" => Some(Self::Mssql),
            "clickhouse" => Some(Self::Clickhouse),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Quotes an identifier, doubling any embedded closing quote character.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            Self::Postgres | Self::Sqlite => format!("\"{}\"", identifier.replace('"', "\"\"")),
            Self::Mysql | Self::Clickhouse => format!("`{}`", identifier.replace('`', "``")),
            Self::Mssql => format!("[{}]", identifier.replace(']', "]]")),
        }
    }

    /// Renders the placeholder for the `index`-th bound parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::Mysql | Self::Sqlite => "?".to_string(),
            Self::Mssql => format!("@p{index}"),
            Self::Clickhouse => format!("{{p{index}:String}}"),
        }
    }

    /// Returns true if tables can be qualified with a schema/database name.
    pub fn supports_schemas(&self) -> bool {
        !matches!(self, Self::Sqlite)
    }

    /// Scanner options matching the dialect's string literal rules.
    pub fn segmenter_options(&self) -> SegmenterOptions {
        SegmenterOptions {
            backslash_escapes: matches!(self, Self::Mysql | Self::Clickhouse),
            bracket_identifiers: matches!(self, Self::Mssql),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "mssql" => Ok(Self::Mssql),
            "clickhouse" => Ok(Self::Clickhouse),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(CompileError::UnknownDialect(s.to_string())),
        }
    }
}
