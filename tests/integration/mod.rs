//! Integration tests for db-runner.

pub mod builder_test;
pub mod postgres_test;
pub mod runner_test;
pub mod segment_test;
pub mod sqlite_test;
