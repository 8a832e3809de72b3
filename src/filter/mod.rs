//! Structured filters, ordering and pagination compiled to dialect SQL.
//!
//! The grid UI and the AI `select` tool describe what they want as
//! [`Filter`]s plus an [`OrderSpec`]; the compiler turns those into
//! [`SqlFragment`]s whose values are always bound, never inlined.

mod compiler;
pub mod operators;

pub use compiler::{compile_limit_offset, compile_order_by, compile_where};
pub use operators::{Arity, OperatorId};

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One column predicate.
///
/// `operator` stays a string so that ids coming from the UI or the AI layer
/// are validated by the compiler, which reports unknown ones by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<V, S>(column: impl Into<String>, operator: OperatorId, values: V) -> Self
    where
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            operator: operator.as_str().to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// How multiple filters are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterConcat {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

impl FilterConcat {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Column ordering, kept in insertion order.
///
/// Serialized as a JSON object (`{"name": "ASC", "id": "DESC"}`); the key
/// order of the object is the sort priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderSpec {
    columns: Vec<(String, SortDirection)>,
}

impl OrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, or updates its direction in place if already present.
    pub fn push(&mut self, column: impl Into<String>, direction: SortDirection) {
        let column = column.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = direction,
            None => self.columns.push((column, direction)),
        }
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.push(column, direction);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.columns.iter().map(|(c, d)| (c.as_str(), *d))
    }
}

impl<S: Into<String>> FromIterator<(S, SortDirection)> for OrderSpec {
    fn from_iter<I: IntoIterator<Item = (S, SortDirection)>>(iter: I) -> Self {
        let mut spec = Self::new();
        for (column, direction) in iter {
            spec.push(column, direction);
        }
        spec
    }
}

impl Serialize for OrderSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, direction) in &self.columns {
            map.serialize_entry(column, direction)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderSpecVisitor;

        impl<'de> Visitor<'de> for OrderSpecVisitor {
            type Value = OrderSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column name to ASC or DESC")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OrderSpec, A::Error> {
                let mut spec = OrderSpec::new();
                while let Some((column, direction)) =
                    access.next_entry::<String, SortDirection>()?
                {
                    spec.push(column, direction);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(OrderSpecVisitor)
    }
}

/// A piece of SQL with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<String>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}
