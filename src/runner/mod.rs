//! Batch execution and result aggregation.
//!
//! The orchestrator runs an [`ExecutionRequest`] statement by statement
//! through an injected [`StatementExecutor`](crate::db::StatementExecutor);
//! the aggregator turns the results into a summary, a notice and per-zone
//! groups for the editor.

pub mod aggregate;
pub mod orchestrator;

pub use aggregate::{summarize, zones, BatchSummary, FixRequest, Notice, NoticeLevel, ResultZone};
pub use orchestrator::{
    BatchRun, BatchStatus, ExecutionItem, ExecutionOrchestrator, ExecutionRequest,
    ExecutionResult, Outcome,
};
