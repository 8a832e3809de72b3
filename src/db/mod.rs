//! Statement execution against live databases.
//!
//! The orchestrator only sees the [`StatementExecutor`] trait; concrete
//! executors wrap a sqlx pool per engine. Execution failures are returned
//! in-band as [`StatementError`] so a batch can keep going.

mod mock;
mod postgres;
mod sqlite;

pub use mock::{MockExecutor, MockResponse};
pub use postgres::PostgresExecutor;
pub use sqlite::SqliteExecutor;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolOptions;
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectionConfig, RunnerConfig};
use crate::dialect::Dialect;
use crate::error::{Result, RunnerError, StatementError};

/// One result row, column name to JSON value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Limits applied by every executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub query_timeout: Duration,
    pub max_rows: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

impl From<&RunnerConfig> for ExecutorOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            query_timeout: config.query_timeout(),
            max_rows: config.max_rows,
        }
    }
}

/// Runs single statements on behalf of the orchestrator.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Executes one statement with positional text parameters.
    ///
    /// Implementations should stop waiting and return
    /// [`StatementError::Cancelled`] once `cancel` fires.
    async fn execute(
        &self,
        sql: &str,
        params: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Row>, StatementError>;

    /// Closes the underlying connection pool.
    async fn close(&self) -> Result<()>;
}

/// Creates an executor for the connection's dialect.
pub async fn connect(
    config: &ConnectionConfig,
    options: ExecutorOptions,
) -> Result<Box<dyn StatementExecutor>> {
    match config.dialect()? {
        Dialect::Postgres => {
            let executor = PostgresExecutor::connect(config, options).await?;
            Ok(Box::new(executor))
        }
        Dialect::Sqlite => {
            let executor = SqliteExecutor::connect(config, options).await?;
            Ok(Box::new(executor))
        }
        dialect @ (Dialect::Mysql | Dialect::Mssql | Dialect::Clickhouse) => {
            Err(RunnerError::config(format!(
                "No bundled driver for {dialect}; statements can be built but not executed"
            )))
        }
    }
}

/// Pool settings that keep a batch on one session.
///
/// Statements in a batch may depend on session state (`SET`, temp tables,
/// an open transaction), so the pool holds exactly one connection and never
/// recycles it while the executor lives.
pub(crate) fn single_session<DB: sqlx::Database>(options: PoolOptions<DB>) -> PoolOptions<DB> {
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(10))
}

/// Races a driver future against the query timeout and the cancellation
/// token.
pub(crate) async fn run_guarded<F>(
    fut: F,
    options: ExecutorOptions,
    cancel: &CancellationToken,
) -> std::result::Result<Vec<Row>, StatementError>
where
    F: std::future::Future<Output = std::result::Result<Vec<Row>, StatementError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(StatementError::Cancelled),
        result = tokio::time::timeout(options.query_timeout, fut) => match result {
            Ok(rows) => rows,
            Err(_) => Err(StatementError::execution(format!(
                "Query timed out after {} seconds",
                options.query_timeout.as_secs()
            ))),
        },
    }
}

/// Renders bytes the way psql does (`\x` followed by hex).
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
