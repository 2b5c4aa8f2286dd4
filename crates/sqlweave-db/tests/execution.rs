//! Executing built queries against the in-memory adapter.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use sqlweave_core::query::{col, Compare, ColumnParser, JoinKind, Query, Record};
use sqlweave_db::{DbError, LoggedAdapter, MemoryAdapter, QueryExecutor, TracingLog};

fn upper() -> ColumnParser {
    ColumnParser::new(|value| match value {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other,
    })
}

// =============================================================================
// Result shapes
// =============================================================================

#[tokio::test]
async fn find_compiles_a_single_row_lookup() {
    let adapter = MemoryAdapter::new();
    adapter.respond(["id", "name"], [vec![json!(7), json!("Ann")]]);

    let query = Query::table("user").primary_key(["id"]).find(7).unwrap();
    let output = QueryExecutor::new(&adapter).run(&query).await.unwrap();

    assert_eq!(output, json!({"id": 7, "name": "Ann"}));
    let sql = &adapter.statements()[0];
    assert!(sql.text.ends_with("LIMIT 1"));
    assert_eq!(sql.values.len(), 1);
}

#[tokio::test]
async fn get_without_rows_is_not_found() {
    let adapter = MemoryAdapter::new();

    let err = QueryExecutor::new(&adapter)
        .run(&Query::table("user").get("name"))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn rows_keep_column_order() {
    let adapter = MemoryAdapter::new();
    adapter.respond(
        ["id", "name"],
        [vec![json!(1), json!("Ann")], vec![json!(2), json!("Bob")]],
    );

    let output = QueryExecutor::new(&adapter)
        .run(&Query::table("user").select(["id", "name"]).rows())
        .await
        .unwrap();

    assert_eq!(output, json!([[1, "Ann"], [2, "Bob"]]));
}

// =============================================================================
// Parsers
// =============================================================================

#[tokio::test]
async fn joined_parsers_decode_aliased_columns() {
    let adapter = MemoryAdapter::new();
    adapter.respond(["id", "bio"], [vec![json!(1), json!("hello")]]);

    let profile = Query::table("profile").parse("bio", upper());
    let query = Query::table("user")
        .join_query(
            JoinKind::Left,
            profile,
            "p",
            [col("p.user_id").eq(col("user.id"))],
        )
        .select(["user.id", "p.bio"]);

    let output = QueryExecutor::new(&adapter).run(&query).await.unwrap();

    assert_eq!(output, json!([{"id": 1, "bio": "HELLO"}]));
}

#[tokio::test]
async fn pluck_applies_the_column_parser() {
    let adapter = MemoryAdapter::new();
    adapter.respond(["name"], [vec![json!("ann")], vec![json!("bob")]]);

    let output = QueryExecutor::new(&adapter)
        .run(&Query::table("user").parse("name", upper()).pluck("name"))
        .await
        .unwrap();

    assert_eq!(output, json!(["ANN", "BOB"]));
}

// =============================================================================
// Callbacks and logging
// =============================================================================

#[tokio::test]
async fn update_callbacks_see_the_returned_rows() {
    let adapter = MemoryAdapter::new();
    adapter.respond(["id"], [vec![json!(3)]]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let query = Query::table("user")
        .filter([col("id").eq(3)])
        .update(Record::new().set("name", "Cy"))
        .returning(["id"])
        .after_update(move |_, output| sink.lock().unwrap().push(output.clone()));

    QueryExecutor::new(&adapter).run(&query).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), [json!([{"id": 3}])]);
}

#[tokio::test]
async fn failing_statement_keeps_its_sqlstate_through_the_log() {
    let adapter = MemoryAdapter::new();
    adapter.fail_with(DbError::with_code("23505", "duplicate key"));
    let logged = LoggedAdapter::new(&adapter, Some(&TracingLog));

    let err = QueryExecutor::new(&logged)
        .run(&Query::table("user").insert(Record::new().set("id", 1)))
        .await
        .unwrap_err();

    assert_eq!(err.code().as_deref(), Some("23505"));
    assert_eq!(adapter.statements().len(), 1);
}

#[tokio::test]
async fn build_errors_never_reach_the_adapter() {
    let adapter = MemoryAdapter::new();

    let err = QueryExecutor::new(&adapter)
        .run(&Query::table("user").delete())
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Build(_)));
    assert!(adapter.statements().is_empty());
}
