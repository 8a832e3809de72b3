//! SQLite statement executor.
//!
//! Parameters bind as text; SQLite's column affinity takes care of numeric
//! comparisons. Values are converted by their storage class rather than by
//! declared column type, since expressions have no declared type.

use std::str::FromStr;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as SqlxRow, TypeInfo, ValueRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::db::{hex_bytes, run_guarded, single_session, ExecutorOptions, Row, StatementExecutor};
use crate::error::{Result, RunnerError, StatementError};

#[derive(Debug)]
pub struct SqliteExecutor {
    pool: SqlitePool,
    options: ExecutorOptions,
}

impl SqliteExecutor {
    pub fn from_pool(pool: SqlitePool, options: ExecutorOptions) -> Self {
        Self { pool, options }
    }

    /// Opens the database on a single connection, creating the file if
    /// needed. An in-memory database lives as long as that connection.
    pub async fn connect(config: &ConnectionConfig, options: ExecutorOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| RunnerError::config(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        let pool = single_session(SqlitePoolOptions::new())
            .connect_with(connect_options)
            .await
            .map_err(|e| RunnerError::connection(format!("Cannot open {}: {e}", config.url)))?;

        debug!("Opened {}", config.display_string());
        Ok(Self { pool, options })
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[String],
    ) -> std::result::Result<Vec<Row>, StatementError> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = query.bind(value.as_str());
        }

        let max_rows = self.options.max_rows;
        let mut stream = query.fetch(&self.pool);
        let mut rows = Vec::new();

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| StatementError::execution(e.to_string()))?
        {
            if rows.len() == max_rows {
                warn!("Statement returned more than {} rows, truncating", max_rows);
                break;
            }
            rows.push(convert_row(&row));
        }

        Ok(rows)
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    async fn execute(
        &self,
        sql: &str,
        params: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Row>, StatementError> {
        run_guarded(self.fetch_rows(sql, params), self.options, cancel).await
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), convert_value(row, i)))
        .collect()
}

fn convert_value(row: &SqliteRow, index: usize) -> serde_json::Value {
    use serde_json::Value;

    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(hex_bytes(&bytes)))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
