//! Structured SELECT building.
//!
//! Grid pagination, quick-select and the AI `select` tool all describe a
//! read as a [`SelectionSpec`] and go through the same builder.

pub mod builder;
pub mod tool;

pub use builder::{build_count, build_select, qualified_table, BuiltQuery, SelectionSpec};
pub use tool::{SelectToolInput, TableAndSchema};
