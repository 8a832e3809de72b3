//! db-runner - the SQL runner core of a database client.
//!
//! Splits editor buffers into statements, flags dangerous ones, compiles
//! grid and AI-tool selections into dialect SQL, runs batches with
//! cancellation and aggregates the results per query zone.

pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod logging;
pub mod query;
pub mod runner;
pub mod safety;
pub mod segment;
