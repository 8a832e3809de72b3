//! PostgreSQL statement executor.
//!
//! Wraps a single-connection sqlx pool so a batch shares one session. Parameters arrive as text; their server-inferred types
//! are looked up with a describe round-trip so `"age" > $1` binds an
//! integer rather than failing with `integer > text`.

use crate::config::ConnectionConfig;
use crate::db::{hex_bytes, run_guarded, single_session, ExecutorOptions, Row, StatementExecutor};
use crate::error::{Result, RunnerError, StatementError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Either, Executor, Postgres, Row as SqlxRow, TypeInfo};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL executor.
#[derive(Debug)]
pub struct PostgresExecutor {
    pool: PgPool,
    options: ExecutorOptions,
}

impl PostgresExecutor {
    /// Wraps an existing pool. Statements only share a session if the pool
    /// holds a single connection.
    pub fn from_pool(pool: PgPool, options: ExecutorOptions) -> Self {
        Self { pool, options }
    }

    /// Connects with retry on transient failures.
    pub async fn connect(config: &ConnectionConfig, options: ExecutorOptions) -> Result<Self> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = single_session(PgPoolOptions::new())
                .connect(&config.url)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool, options });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(RunnerError::internal("no connection attempt was made")),
        }
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[String],
    ) -> std::result::Result<Vec<Row>, StatementError> {
        let query = if params.is_empty() {
            sqlx::query(sql)
        } else {
            let described = (&self.pool)
                .describe(sql)
                .await
                .map_err(|e| StatementError::execution(format_query_error(e)))?;
            let types = match described.parameters() {
                Some(Either::Left(types)) => types.to_vec(),
                _ => Vec::new(),
            };
            bind_params(sqlx::query(sql), params, &types)?
        };

        let max_rows = self.options.max_rows;
        let mut stream = query.fetch(&self.pool);
        let mut rows = Vec::new();

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| StatementError::execution(format_query_error(e)))?
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
impl StatementExecutor for PostgresExecutor {
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

/// Binds text parameters as the types the server inferred for them.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [String],
    types: &[PgTypeInfo],
) -> std::result::Result<Query<'q, Postgres, PgArguments>, StatementError> {
    for (i, value) in params.iter().enumerate() {
        let type_name = types.get(i).map(|t| t.name().to_uppercase()).unwrap_or_default();
        let invalid = || {
            StatementError::execution(format!(
                "parameter ${}: '{}' is not a valid {}",
                i + 1,
                value,
                type_name
            ))
        };

        query = match type_name.as_str() {
            "BOOL" => query.bind(parse_bool(value).ok_or_else(invalid)?),
            "INT2" => query.bind(value.trim().parse::<i16>().map_err(|_| invalid())?),
            "INT4" => query.bind(value.trim().parse::<i32>().map_err(|_| invalid())?),
            "INT8" => query.bind(value.trim().parse::<i64>().map_err(|_| invalid())?),
            "FLOAT4" => query.bind(value.trim().parse::<f32>().map_err(|_| invalid())?),
            "FLOAT8" => query.bind(value.trim().parse::<f64>().map_err(|_| invalid())?),
            _ => query.bind(value.as_str()),
        };
    }
    Ok(query)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Converts a sqlx PgRow to a JSON row.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (
                col.name().to_string(),
                convert_value(row, i, col.type_info().name()),
            )
        })
        .collect()
}

/// Converts a single column value from a PgRow to a JSON value.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| float_value(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(float_value)
            .unwrap_or(Value::Null),

        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| Value::String(hex_bytes(&bytes)))
            .unwrap_or(Value::Null),

        // Text-like types decode as strings; anything without a decoder in
        // the enabled sqlx features is reported by type name.
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(Some(s)) => Value::String(s),
            Ok(None) => Value::Null,
            Err(_) => Value::String(format!("<{}>", type_name.to_lowercase())),
        },
    }
}

fn float_value(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(v.to_string()))
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
        || error_str.contains("does not exist")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> RunnerError {
    let url = Url::parse(&config.url).ok();
    let host = url
        .as_ref()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "localhost".to_string());
    let port = url.as_ref().and_then(|u| u.port()).unwrap_or(5432);
    let user = url
        .as_ref()
        .map(|u| u.username().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let database = url
        .as_ref()
        .map(|u| u.path().trim_start_matches('/').to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        RunnerError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        RunnerError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        RunnerError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        RunnerError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.",
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        RunnerError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        RunnerError::connection(error.to_string())
    }
}

/// Formats a query error with Postgres detail fields when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let fields = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
            ("CONSTRAINT", pg_error.constraint()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                result.push_str(&format!("\n  {label}: {value}"));
            }
        }
    }

    result
}
