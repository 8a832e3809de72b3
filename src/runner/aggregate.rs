//! Batch outcome aggregation: counts, the user-facing notice, and per-zone
//! grouping of results for the editor.

use std::fmt;

use serde::Serialize;

use crate::safety;

use super::orchestrator::ExecutionResult;

/// Counts over a batch's results.
///
/// `failure_count` includes cancelled statements; `cancelled_count` is the
/// cancelled subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub cancelled_count: usize,
    pub dangerous_count: usize,
}

/// Severity of a batch notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// One-line message shown after a batch that touched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: &'static str,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.success_count == 0
    }

    pub fn has_dangerous(&self) -> bool {
        self.dangerous_count > 0
    }

    pub fn all_dangerous(&self) -> bool {
        self.total > 0 && self.dangerous_count == self.total
    }

    /// Notice for the batch, or `None` when no dangerous statement ran.
    ///
    /// Read-only batches speak for themselves through their result grids.
    pub fn notice(&self) -> Option<Notice> {
        if !self.has_dangerous() {
            return None;
        }

        let plural = self.dangerous_count > 1;
        let notice = if self.all_succeeded() {
            Notice {
                level: NoticeLevel::Success,
                message: if plural {
                    "All queries executed successfully!"
                } else {
                    "Query executed successfully!"
                },
            }
        } else if self.all_failed() {
            Notice {
                level: NoticeLevel::Error,
                message: if plural {
                    "All queries failed to execute!"
                } else {
                    "Query failed to execute!"
                },
            }
        } else {
            Notice {
                level: NoticeLevel::Warning,
                message: if plural {
                    "Some queries failed to execute!"
                } else {
                    "Query failed to execute!"
                },
            }
        };
        Some(notice)
    }
}

/// Counts successes, failures and dangerous statements.
pub fn summarize(results: &[ExecutionResult]) -> BatchSummary {
    results.iter().fold(
        BatchSummary {
            total: results.len(),
            ..BatchSummary::default()
        },
        |mut summary, result| {
            if result.is_success() {
                summary.success_count += 1;
            } else {
                summary.failure_count += 1;
            }
            if result.is_cancelled() {
                summary.cancelled_count += 1;
            }
            if safety::is_dangerous(&result.statement.text) {
                summary.dangerous_count += 1;
            }
            summary
        },
    )
}

/// Results belonging to one editor query zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultZone<'a> {
    pub start_line: usize,
    pub end_line: usize,
    pub results: Vec<&'a ExecutionResult>,
}

/// Payload handed to the AI layer to repair a failing zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixRequest {
    /// The zone's statements, each terminated with `;`, joined by spaces.
    pub sql: String,
    /// The first error in the zone.
    pub error: String,
}

impl ResultZone<'_> {
    pub fn has_error(&self) -> bool {
        self.results.iter().any(|r| !r.is_success())
    }

    /// Builds the "fix with AI" payload, if any statement in the zone failed
    /// for a reason other than cancellation.
    pub fn fix_request(&self) -> Option<FixRequest> {
        let error = self
            .results
            .iter()
            .filter_map(|r| r.error())
            .find(|e| !e.is_cancelled())?;

        let sql = self
            .results
            .iter()
            .map(|r| format!("{};", r.statement.text))
            .collect::<Vec<_>>()
            .join(" ");

        Some(FixRequest {
            sql,
            error: error.to_string(),
        })
    }
}

/// Groups results by line range, in order of first appearance.
pub fn zones(results: &[ExecutionResult]) -> Vec<ResultZone<'_>> {
    let mut zones: Vec<ResultZone<'_>> = Vec::new();
    for result in results {
        let (start_line, end_line) = (result.statement.start_line, result.statement.end_line);
        match zones
            .iter_mut()
            .find(|z| z.start_line == start_line && z.end_line == end_line)
        {
            Some(zone) => zone.results.push(result),
            None => zones.push(ResultZone {
                start_line,
                end_line,
                results: vec![result],
            }),
        }
    }
    zones
}
