//! Scripted executor for testing.
//!
//! Responses are keyed by exact statement text; anything unscripted succeeds
//! with no rows.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Row, StatementExecutor};
use crate::error::{Result, StatementError};

/// What the mock does when it sees a statement.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with these rows.
    Rows(Vec<Row>),
    /// Fail with this driver message.
    Fail(String),
    /// Succeed, then cancel the batch token, as if the user hit cancel
    /// while the statement was running.
    RowsThenCancel(Vec<Row>),
    /// Never finish on its own; returns once the batch is cancelled.
    Hang,
}

/// An executor that replays scripted responses and records every call.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: HashMap<String, MockResponse>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for a statement.
    pub fn on(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(sql.into(), response);
        self
    }

    /// Shorthand for a failing statement.
    pub fn failing(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.on(sql, MockResponse::Fail(message.into()))
    }

    /// Statements executed so far, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(sql, _)| sql)
            .collect()
    }

    /// Statements and their parameters, in call order.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StatementExecutor for MockExecutor {
    async fn execute(
        &self,
        sql: &str,
        params: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Row>, StatementError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((sql.to_string(), params.to_vec()));
        }

        match self.responses.get(sql) {
            None => Ok(Vec::new()),
            Some(MockResponse::Rows(rows)) => Ok(rows.clone()),
            Some(MockResponse::Fail(message)) => Err(StatementError::execution(message.clone())),
            Some(MockResponse::RowsThenCancel(rows)) => {
                cancel.cancel();
                Ok(rows.clone())
            }
            Some(MockResponse::Hang) => {
                cancel.cancelled().await;
                Err(StatementError::Cancelled)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
