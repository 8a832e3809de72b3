//! End-to-end runs against SQLite databases.

use std::io::Write;

use db_runner::config::{Config, ConnectionConfig};
use db_runner::db::{self, ExecutorOptions, StatementExecutor};
use db_runner::dialect::Dialect;
use db_runner::filter::{Filter, FilterConcat, OperatorId, OrderSpec, SortDirection};
use db_runner::query::{build_count, build_select, SelectionSpec};
use db_runner::runner::{
    summarize, zones, BatchStatus, ExecutionOrchestrator, ExecutionRequest, NoticeLevel,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const SEED: &str = "\
CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, email TEXT);
INSERT INTO people (name, age, email) VALUES
  ('ann', 17, 'ann@example.com'),
  ('bob', 30, NULL),
  ('cy', 45, 'cy@example.org'),
  ('dee', 70, 'dee@example.com');";

async fn seeded_executor() -> Box<dyn StatementExecutor> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[runner]\nmax_rows = 100\n\n[connections.default]\nurl = \"sqlite::memory:\"\n"
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let connection = config.get_connection(None).unwrap();
    assert_eq!(connection.dialect().unwrap(), Dialect::Sqlite);

    let executor = db::connect(connection, ExecutorOptions::from(&config.runner))
        .await
        .unwrap();
    let seed = ExecutionRequest::from_buffer(SEED, Dialect::Sqlite);
    let results = ExecutionOrchestrator::new(executor.as_ref())
        .run(&seed, &CancellationToken::new())
        .await;
    assert!(results.iter().all(|r| r.is_success()));
    executor
}

#[tokio::test]
async fn test_buffer_run_with_failure_and_zones() {
    let executor = seeded_executor().await;
    let buffer = "SELECT name FROM people WHERE age > 40 ORDER BY id;\nSELECT nope FROM people; SELECT 1 AS one;\nDELETE FROM people WHERE age < 18;";
    let request = ExecutionRequest::from_buffer(buffer, Dialect::Sqlite);
    assert!(request.requires_confirmation());

    let batch = ExecutionOrchestrator::new(executor.as_ref())
        .run_batch(&request, &CancellationToken::new())
        .await;
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.results.len(), 4);

    let names: Vec<_> = batch.results[0]
        .rows()
        .unwrap()
        .iter()
        .map(|r| r["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("cy"), json!("dee")]);
    assert!(batch.results[1].error().unwrap().to_string().contains("no such column"));
    assert_eq!(batch.results[2].rows().unwrap()[0]["one"], json!(1));

    let summary = summarize(&batch.results);
    assert_eq!((summary.success_count, summary.failure_count), (3, 1));
    // One dangerous statement in a batch with a failure: singular warning.
    let notice = summary.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Query failed to execute!");

    let zones = zones(&batch.results);
    assert_eq!(zones.len(), 3);
    let fix = zones[1].fix_request().unwrap();
    assert_eq!(fix.sql, "SELECT nope FROM people; SELECT 1 AS one;");

    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_built_queries_run_with_bound_params() {
    let executor = seeded_executor().await;

    let spec = SelectionSpec {
        table: "people".to_string(),
        schema: Some("main".to_string()),
        filters: vec![
            Filter::new("age", OperatorId::Between, ["18", "65"]),
            Filter::new("email", OperatorId::IsNotNull, Vec::<String>::new()),
        ],
        filters_concat_operator: FilterConcat::And,
        order_by: OrderSpec::new().with("age", SortDirection::Desc),
        limit: Some(10),
        offset: None,
        select: vec!["name".to_string(), "age".to_string()],
    };

    let query = build_select(&spec, Dialect::Sqlite).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "name", "age" FROM "people" WHERE ("age" BETWEEN ? AND ?) AND ("email" IS NOT NULL) ORDER BY "age" DESC LIMIT 10"#
    );

    let request = ExecutionRequest::from_query(query, Dialect::Sqlite);
    let results = ExecutionOrchestrator::new(executor.as_ref())
        .run(&request, &CancellationToken::new())
        .await;
    let rows = results[0].rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({"name": "cy", "age": 45}));

    let count = build_count(&spec, Dialect::Sqlite).unwrap();
    let request = ExecutionRequest::from_query(count, Dialect::Sqlite);
    let results = ExecutionOrchestrator::new(executor.as_ref())
        .run(&request, &CancellationToken::new())
        .await;
    assert_eq!(results[0].rows().unwrap()[0]["total"], json!(1));
}

#[tokio::test]
async fn test_contains_and_in_filters() {
    let executor = seeded_executor().await;

    let mut spec = SelectionSpec::new("people");
    spec.filters = vec![
        Filter::new("email", OperatorId::EndsWith, ["example.com"]),
        Filter::new("name", OperatorId::In, ["bob", "dee"]),
    ];
    spec.filters_concat_operator = FilterConcat::Or;
    spec.order_by = OrderSpec::new().with("id", SortDirection::Asc);
    spec.select = vec!["name".to_string()];

    let query = build_select(&spec, Dialect::Sqlite).unwrap();
    let request = ExecutionRequest::from_query(query, Dialect::Sqlite);
    let results = ExecutionOrchestrator::new(executor.as_ref())
        .run(&request, &CancellationToken::new())
        .await;

    let names: Vec<_> = results[0]
        .rows()
        .unwrap()
        .iter()
        .map(|r| r["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("ann"), json!("bob"), json!("dee")]);
}

#[tokio::test]
async fn test_file_database_batch_shares_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("session.db").display());
    let connection = ConnectionConfig::from_url(&url).unwrap();
    let executor = db::connect(&connection, ExecutorOptions::default())
        .await
        .unwrap();

    // Temp tables are visible only to the connection that created them.
    let buffer = "\
CREATE TEMP TABLE scratch (n INTEGER);
INSERT INTO scratch VALUES (1), (2);
SELECT count(*) AS total FROM scratch;";
    let request = ExecutionRequest::from_buffer(buffer, Dialect::Sqlite);
    let batch = ExecutionOrchestrator::new(executor.as_ref())
        .run_batch(&request, &CancellationToken::new())
        .await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(batch.results.iter().all(|r| r.is_success()));
    assert_eq!(batch.results[2].rows().unwrap()[0]["total"], json!(2));

    executor.close().await.unwrap();
}
