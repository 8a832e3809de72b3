//! Postgres integration tests.
//!
//! Skipped unless DATABASE_URL points at a reachable database.

use db_runner::config::ConnectionConfig;
use db_runner::db::{ExecutorOptions, PostgresExecutor, StatementExecutor};
use db_runner::dialect::Dialect;
use db_runner::filter::{Filter, OperatorId};
use db_runner::query::{build_count, build_select, SelectionSpec};
use db_runner::runner::{summarize, BatchStatus, ExecutionOrchestrator, ExecutionRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test executor.
async fn get_test_executor() -> Option<PostgresExecutor> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_url(&url).ok()?;
    PostgresExecutor::connect(&config, ExecutorOptions::default())
        .await
        .ok()
}

#[tokio::test]
async fn test_batch_with_failing_statement() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let buffer = "\
SELECT n, n * 2 AS doubled FROM generate_series(1, 3) AS n;
SELECT 1 / 0;
SELECT 'ok'::text AS status;";
    let request = ExecutionRequest::from_buffer(buffer, Dialect::Postgres);
    let batch = ExecutionOrchestrator::new(&executor)
        .run_batch(&request, &CancellationToken::new())
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.results.len(), 3);
    assert_eq!(batch.results[0].rows().unwrap().len(), 3);
    assert_eq!(batch.results[0].rows().unwrap()[2]["doubled"], json!(6));
    assert!(batch.results[1]
        .error()
        .unwrap()
        .to_string()
        .contains("division by zero"));
    assert_eq!(batch.results[2].rows().unwrap()[0]["status"], json!("ok"));

    let summary = summarize(&batch.results);
    assert_eq!((summary.success_count, summary.failure_count), (2, 1));
    assert_eq!(summary.notice(), None);

    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_built_select_against_catalog() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let mut spec = SelectionSpec::new("pg_type").schema("pg_catalog").limit(5);
    spec.select = vec!["typname".to_string(), "typlen".to_string()];
    spec.filters = vec![
        Filter::new("typname", OperatorId::In, ["int4", "bool", "text"]),
        Filter::new("typlen", OperatorId::Gte, ["-1"]),
    ];

    let query = build_select(&spec, Dialect::Postgres).unwrap();
    let results = ExecutionOrchestrator::new(&executor)
        .run(
            &ExecutionRequest::from_query(query, Dialect::Postgres),
            &CancellationToken::new(),
        )
        .await;
    assert!(results[0].is_success(), "{:?}", results[0].error());
    assert_eq!(results[0].rows().unwrap().len(), 3);

    let count = build_count(&spec, Dialect::Postgres).unwrap();
    let results = ExecutionOrchestrator::new(&executor)
        .run(
            &ExecutionRequest::from_query(count, Dialect::Postgres),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(results[0].rows().unwrap()[0]["total"], json!(3));

    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_cancel_stops_long_running_batch() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let request = ExecutionRequest::from_buffer(
        "SELECT pg_sleep(30);\nSELECT 2;",
        Dialect::Postgres,
    );
    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            cancel.cancel();
        })
    };

    let batch = ExecutionOrchestrator::new(&executor)
        .run_batch(&request, &cancel)
        .await;
    canceller.await.unwrap();

    assert_eq!(batch.status, BatchStatus::Cancelled);
    assert_eq!(batch.results.len(), 1);
    assert!(batch.results[0].is_cancelled());

    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_batch_keeps_session_state() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let buffer = "\
SET application_name = 'dbrun_session_check';
CREATE TEMP TABLE scratch (n int);
INSERT INTO scratch VALUES (1), (2), (3);
SELECT count(*) AS total, current_setting('application_name') AS app FROM scratch;";
    let request = ExecutionRequest::from_buffer(buffer, Dialect::Postgres);
    let batch = ExecutionOrchestrator::new(&executor)
        .run_batch(&request, &CancellationToken::new())
        .await;

    assert!(batch.results.iter().all(|r| r.is_success()));
    let row = &batch.results[3].rows().unwrap()[0];
    assert_eq!(row["total"], json!(3));
    assert_eq!(row["app"], json!("dbrun_session_check"));

    executor.close().await.unwrap();
}
