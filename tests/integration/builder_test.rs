//! Query builder behaviour across every dialect.

use db_runner::dialect::Dialect;
use db_runner::error::CompileError;
use db_runner::filter::{Arity, Filter, FilterConcat, OperatorId, OrderSpec, SortDirection};
use db_runner::query::{build_count, build_select, SelectToolInput, SelectionSpec};
use pretty_assertions::assert_eq;

fn users_page() -> SelectionSpec {
    SelectionSpec {
        table: "users".to_string(),
        schema: Some("public".to_string()),
        filters: vec![
            Filter::new("name", OperatorId::Contains, ["ann"]),
            Filter::new("status", OperatorId::In, ["a", " b"]),
        ],
        filters_concat_operator: FilterConcat::And,
        order_by: OrderSpec::new().with("id", SortDirection::Desc),
        limit: Some(10),
        offset: Some(20),
        select: vec!["id".to_string(), "name".to_string()],
    }
}

#[test]
fn test_select_matrix() {
    let cases = [
        (
            Dialect::Postgres,
            r#"SELECT "id", "name" FROM "public"."users" WHERE ("name" LIKE ('%' || $1 || '%')) AND ("status" IN ($2, $3)) ORDER BY "id" DESC LIMIT 10 OFFSET 20"#,
        ),
        (
            Dialect::Mysql,
            "SELECT `id`, `name` FROM `public`.`users` WHERE (`name` LIKE CONCAT('%', ?, '%')) AND (`status` IN (?, ?)) ORDER BY `id` DESC LIMIT 10 OFFSET 20",
        ),
        (
            Dialect::Mssql,
            "SELECT [id], [name] FROM [public].[users] WHERE ([name] LIKE ('%' + @p1 + '%')) AND ([status] IN (@p2, @p3)) ORDER BY [id] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
        ),
        (
            Dialect::Clickhouse,
            "SELECT `id`, `name` FROM `public`.`users` WHERE (`name` LIKE CONCAT('%', {p1:String}, '%')) AND (`status` IN ({p2:String}, {p3:String})) ORDER BY `id` DESC LIMIT 10 OFFSET 20",
        ),
        (
            Dialect::Sqlite,
            r#"SELECT "id", "name" FROM "users" WHERE ("name" LIKE ('%' || ? || '%')) AND ("status" IN (?, ?)) ORDER BY "id" DESC LIMIT 10 OFFSET 20"#,
        ),
    ];

    for (dialect, expected) in cases {
        let query = build_select(&users_page(), dialect).unwrap();
        assert_eq!(query.sql, expected, "dialect: {dialect}");
        assert_eq!(query.params, vec!["ann", "a", "b"], "dialect: {dialect}");
    }
}

#[test]
fn test_plain_page_of_users() {
    let spec = SelectionSpec::new("users").schema("public").limit(10);
    let query = build_select(&spec, Dialect::Postgres).unwrap();
    assert_eq!(query.sql, r#"SELECT * FROM "public"."users" LIMIT 10"#);
    assert!(query.params.is_empty());
}

#[test]
fn test_mssql_paging_without_order_gets_neutral_order() {
    let spec = SelectionSpec::new("t").schema("dbo").limit(5);
    let query = build_select(&spec, Dialect::Mssql).unwrap();
    assert_eq!(
        query.sql,
        "SELECT * FROM [dbo].[t] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_count_ignores_paging_and_order() {
    let query = build_count(&users_page(), Dialect::Postgres).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT COUNT(*) AS total FROM "public"."users" WHERE ("name" LIKE ('%' || $1 || '%')) AND ("status" IN ($2, $3))"#
    );
    assert_eq!(query.params, vec!["ann", "a", "b"]);
}

#[test]
fn test_every_operator_binds_one_param_per_value() {
    for op in OperatorId::ALL {
        let values: Vec<String> = match op.arity() {
            Arity::None => vec![],
            Arity::One => vec!["x".to_string()],
            Arity::Two => vec!["1".to_string(), "9".to_string()],
            Arity::AtLeastOne => vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        for dialect in Dialect::ALL {
            let mut spec = SelectionSpec::new("t");
            spec.filters = vec![Filter::new("col", op, values.clone())];
            let query = build_select(&spec, dialect).unwrap();
            assert_eq!(query.params, values, "{op} / {dialect}");
            for slot in ["{col}", "{v}", "{v1}", "{v2}", "{list}"] {
                assert!(!query.sql.contains(slot), "{op} / {dialect}: {}", query.sql);
            }
        }
    }
}

#[test]
fn test_unknown_operator_names_itself() {
    let mut spec = SelectionSpec::new("t");
    spec.filters = vec![Filter {
        column: "a".to_string(),
        operator: "approximately".to_string(),
        values: vec!["1".to_string()],
    }];
    assert_eq!(
        build_select(&spec, Dialect::Postgres),
        Err(CompileError::InvalidOperator("approximately".to_string()))
    );
}

#[test]
fn test_between_with_one_value_is_rejected() {
    let mut spec = SelectionSpec::new("t");
    spec.filters = vec![Filter::new("age", OperatorId::Between, ["18"])];
    let err = build_select(&spec, Dialect::Mysql).unwrap_err();
    assert_eq!(
        err,
        CompileError::InvalidFilterArity {
            operator: "between".to_string(),
            expected: "2",
            actual: 1,
        }
    );
}

#[test]
fn test_tool_call_arguments() {
    let args: SelectToolInput = serde_json::from_str(
        r#"{
            "whereConcatOperator": "AND",
            "whereFilters": [{"column": "total", "operator": "gte", "values": ["100"]}],
            "select": ["id", "total"],
            "limit": 50,
            "offset": 0,
            "orderBy": {"total": "DESC", "id": "ASC"},
            "tableAndSchema": {"tableName": "orders", "schemaName": "public"}
        }"#,
    )
    .unwrap();

    let query = args.build(Dialect::Postgres).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "id", "total" FROM "public"."orders" WHERE "total" >= $1 ORDER BY "total" DESC, "id" ASC LIMIT 50"#
    );
    assert_eq!(query.params, vec!["100"]);
}
