//! Sequential batch execution with cooperative cancellation.

use std::time::{Duration, Instant};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{Row, StatementExecutor};
use crate::dialect::Dialect;
use crate::error::StatementError;
use crate::query::BuiltQuery;
use crate::safety;
use crate::segment::{Segmenter, Statement};

/// One statement to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionItem {
    pub statement: Statement,
    pub dialect: Dialect,
    /// Bound parameters; empty for statements typed into the editor.
    pub params: Vec<String>,
}

/// An ordered batch of statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    items: Vec<ExecutionItem>,
}

impl ExecutionRequest {
    /// Creates a request running `statements` in order.
    pub fn new(dialect: Dialect, statements: impl IntoIterator<Item = Statement>) -> Self {
        let items = statements
            .into_iter()
            .map(|statement| ExecutionItem {
                statement,
                dialect,
                params: Vec::new(),
            })
            .collect();
        Self { items }
    }

    /// Segments a buffer with the dialect's string rules.
    pub fn from_buffer(buffer: &str, dialect: Dialect) -> Self {
        let statements = Segmenter::new(dialect.segmenter_options()).segment(buffer);
        Self::new(dialect, statements)
    }

    /// Wraps a built query as a one-statement batch.
    pub fn from_query(query: BuiltQuery, dialect: Dialect) -> Self {
        let line_count = query.sql.lines().count().max(1);
        Self {
            items: vec![ExecutionItem {
                statement: Statement::new(query.sql, 1, line_count),
                dialect,
                params: query.params,
            }],
        }
    }

    pub fn items(&self) -> &[ExecutionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Statements containing a dangerous keyword, in batch order.
    pub fn dangerous_statements(&self) -> Vec<&Statement> {
        self.items
            .iter()
            .map(|item| &item.statement)
            .filter(|stmt| safety::is_dangerous(&stmt.text))
            .collect()
    }

    /// Returns true if the caller must confirm before running the batch.
    pub fn requires_confirmation(&self) -> bool {
        self.items
            .iter()
            .any(|item| safety::is_dangerous(&item.statement.text))
    }
}

/// How a single statement ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(Vec<Row>),
    Failed(StatementError),
}

/// Result of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub statement: Statement,
    pub outcome: Outcome,
    /// Time spent in the executor call only.
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn rows(&self) -> Option<&[Row]> {
        match &self.outcome {
            Outcome::Succeeded(rows) => Some(rows),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StatementError> {
        match &self.outcome {
            Outcome::Succeeded(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded(_))
    }

    /// Returns true if the statement was interrupted by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.error().is_some_and(StatementError::is_cancelled)
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExecutionResult", 5)?;
        state.serialize_field("statement", &self.statement)?;
        state.serialize_field("rows", &self.rows())?;
        state.serialize_field("error", &self.error().map(ToString::to_string))?;
        state.serialize_field("durationMs", &(self.duration.as_micros() as f64 / 1000.0))?;
        state.serialize_field("cancelled", &self.is_cancelled())?;
        state.end()
    }
}

/// Terminal state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every statement was attempted.
    Completed,
    /// Cancellation stopped the batch early.
    Cancelled,
}

/// Results of a batch run, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRun {
    pub status: BatchStatus,
    pub results: Vec<ExecutionResult>,
}

/// Runs batches one statement at a time.
///
/// Dangerous statements are not gated here; callers check
/// [`ExecutionRequest::requires_confirmation`] first.
pub struct ExecutionOrchestrator<'a> {
    executor: &'a dyn StatementExecutor,
}

impl<'a> ExecutionOrchestrator<'a> {
    pub fn new(executor: &'a dyn StatementExecutor) -> Self {
        Self { executor }
    }

    /// Runs the batch and returns the results of every attempted statement.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        self.run_batch(request, cancel).await.results
    }

    /// Runs the batch, reporting whether it completed or was cancelled.
    ///
    /// A failing statement does not stop the batch. Cancellation is checked
    /// before each statement; statements not yet started are omitted.
    pub async fn run_batch(&self, request: &ExecutionRequest, cancel: &CancellationToken) -> BatchRun {
        let total = request.len();
        let mut results = Vec::with_capacity(total);
        info!("Running batch of {} statement(s)", total);

        for (index, item) in request.items().iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Batch cancelled after {} of {} statement(s)",
                    index, total
                );
                return BatchRun {
                    status: BatchStatus::Cancelled,
                    results,
                };
            }

            debug!(
                "Executing statement {}/{} (lines {}-{})",
                index + 1,
                total,
                item.statement.start_line,
                item.statement.end_line
            );

            let start = Instant::now();
            let outcome = match self
                .executor
                .execute(&item.statement.text, &item.params, cancel)
                .await
            {
                Ok(rows) => Outcome::Succeeded(rows),
                Err(e) => Outcome::Failed(e),
            };
            let duration = start.elapsed();

            match &outcome {
                Outcome::Succeeded(rows) => {
                    debug!("Statement {} returned {} row(s) in {:?}", index + 1, rows.len(), duration)
                }
                Outcome::Failed(e) => warn!("Statement {} failed: {}", index + 1, e),
            }

            results.push(ExecutionResult {
                statement: item.statement.clone(),
                outcome,
                duration,
            });
        }

        let status = if results.last().is_some_and(ExecutionResult::is_cancelled) {
            BatchStatus::Cancelled
        } else {
            BatchStatus::Completed
        };

        BatchRun { status, results }
    }
}
