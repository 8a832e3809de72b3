//! Arguments of the AI layer's `select` tool.
//!
//! The chat layer sends these as JSON; they are mapped onto a
//! [`SelectionSpec`] so tool calls go through the same builder as the grid.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::filter::{Filter, FilterConcat, OrderSpec};

use super::builder::{build_select, BuiltQuery, SelectionSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAndSchema {
    pub table_name: String,
    pub schema_name: String,
}

/// `select` tool call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectToolInput {
    pub where_concat_operator: FilterConcat,
    pub where_filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    pub limit: u64,
    pub offset: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderSpec>,
    pub table_and_schema: TableAndSchema,
}

impl SelectToolInput {
    /// Builds the query this tool call asks for.
    pub fn build(&self, dialect: Dialect) -> Result<BuiltQuery, CompileError> {
        build_select(&SelectionSpec::from(self.clone()), dialect)
    }
}

impl From<SelectToolInput> for SelectionSpec {
    fn from(input: SelectToolInput) -> Self {
        let TableAndSchema {
            table_name,
            schema_name,
        } = input.table_and_schema;

        Self {
            table: table_name,
            schema: Some(schema_name),
            filters: input.where_filters,
            filters_concat_operator: input.where_concat_operator,
            order_by: input.order_by.unwrap_or_default(),
            limit: Some(input.limit),
            offset: Some(input.offset),
            select: input.select.unwrap_or_default(),
        }
    }
}
