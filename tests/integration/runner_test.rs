//! Batch orchestration and aggregation against the scripted executor.

use std::time::Duration;

use db_runner::db::{MockExecutor, MockResponse, Row};
use db_runner::dialect::Dialect;
use db_runner::query::{build_select, SelectionSpec};
use db_runner::runner::{
    summarize, zones, BatchStatus, ExecutionOrchestrator, ExecutionRequest, NoticeLevel,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("row must be an object"),
    }
}

const EDITOR_BUFFER: &str = "\
SELECT id FROM users;
DELETE FROM sessions WHERE expired; SELECT count(*) FROM sessions;

UPDATE users SET active = false WHERE id = 7;";

#[tokio::test]
async fn test_middle_failure_does_not_stop_batch() {
    let mock = MockExecutor::new()
        .on("SELECT id FROM users", MockResponse::Rows(vec![row(json!({"id": 1}))]))
        .failing(
            "DELETE FROM sessions WHERE expired",
            "permission denied for table sessions",
        );
    let request = ExecutionRequest::from_buffer(EDITOR_BUFFER, Dialect::Postgres);
    assert_eq!(request.len(), 4);

    let batch = ExecutionOrchestrator::new(&mock)
        .run_batch(&request, &CancellationToken::new())
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.results.len(), 4);
    assert_eq!(mock.executed().len(), 4);
    assert!(batch.results[0].is_success());
    assert!(!batch.results[1].is_success());
    assert!(batch.results[3].is_success());

    let summary = summarize(&batch.results);
    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.failure_count, 1);
    assert_eq!(summary.dangerous_count, 2);
    let notice = summary.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Some queries failed to execute!");
}

#[tokio::test]
async fn test_zones_and_fix_request_follow_editor_blocks() {
    let mock = MockExecutor::new().failing(
        "SELECT count(*) FROM sessions",
        "relation \"sessions\" does not exist",
    );
    let request = ExecutionRequest::from_buffer(EDITOR_BUFFER, Dialect::Postgres);
    let results = ExecutionOrchestrator::new(&mock)
        .run(&request, &CancellationToken::new())
        .await;

    let zones = zones(&results);
    let ranges: Vec<(usize, usize, usize)> = zones
        .iter()
        .map(|z| (z.start_line, z.end_line, z.results.len()))
        .collect();
    assert_eq!(ranges, vec![(1, 1, 1), (2, 2, 2), (4, 4, 1)]);

    assert_eq!(zones[0].fix_request(), None);
    let fix = zones[1].fix_request().unwrap();
    assert_eq!(
        fix.sql,
        "DELETE FROM sessions WHERE expired; SELECT count(*) FROM sessions;"
    );
    assert_eq!(fix.error, "relation \"sessions\" does not exist");
}

#[tokio::test]
async fn test_cancel_after_first_statement() {
    let mock = MockExecutor::new().on("SELECT id FROM users", MockResponse::RowsThenCancel(vec![]));
    let request = ExecutionRequest::from_buffer(EDITOR_BUFFER, Dialect::Postgres);

    let batch = ExecutionOrchestrator::new(&mock)
        .run_batch(&request, &CancellationToken::new())
        .await;

    assert_eq!(batch.status, BatchStatus::Cancelled);
    assert_eq!(batch.results.len(), 1);
    assert_eq!(mock.executed(), vec!["SELECT id FROM users"]);
}

#[tokio::test]
async fn test_cancel_from_another_task_interrupts_running_statement() {
    let mock = MockExecutor::new().on("SELECT id FROM users", MockResponse::Hang);
    let request = ExecutionRequest::from_buffer(EDITOR_BUFFER, Dialect::Postgres);
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let batch = ExecutionOrchestrator::new(&mock).run_batch(&request, &cancel).await;
    canceller.await.unwrap();

    assert_eq!(batch.status, BatchStatus::Cancelled);
    assert_eq!(batch.results.len(), 1);
    assert!(batch.results[0].is_cancelled());

    let summary = summarize(&batch.results);
    assert_eq!(summary.cancelled_count, 1);
    assert_eq!(summary.notice(), None);
    assert_eq!(zones(&batch.results)[0].fix_request(), None);
}

#[test]
fn test_built_query_params_reach_executor() {
    let mut spec = SelectionSpec::new("users").schema("public").limit(25);
    spec.filters = vec![db_runner::filter::Filter::new(
        "email",
        db_runner::filter::OperatorId::EndsWith,
        ["@example.com"],
    )];
    let query = build_select(&spec, Dialect::Postgres).unwrap();
    let sql = query.sql.clone();

    let mock = MockExecutor::new();
    let request = ExecutionRequest::from_query(query, Dialect::Postgres);
    let results = tokio_test::block_on(
        ExecutionOrchestrator::new(&mock).run(&request, &CancellationToken::new()),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(
        mock.calls(),
        vec![(sql, vec!["@example.com".to_string()])]
    );
}

#[test]
fn test_confirmation_is_required_for_dangerous_batches() {
    let request = ExecutionRequest::from_buffer(EDITOR_BUFFER, Dialect::Postgres);
    assert!(request.requires_confirmation());
    let dangerous: Vec<&str> = request
        .dangerous_statements()
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(
        dangerous,
        vec![
            "DELETE FROM sessions WHERE expired",
            "UPDATE users SET active = false WHERE id = 7"
        ]
    );

    let read_only = ExecutionRequest::from_buffer("SELECT 1;\n-- DROP TABLE x;", Dialect::Postgres);
    assert!(!read_only.requires_confirmation());
}
