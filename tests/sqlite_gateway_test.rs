//! `SqlGateway` against a real SQLite file.

use pretty_assertions::assert_eq;
use sqlflow::config::ConnectionConfig;
use sqlflow::db::{DatabaseGateway, QueryResult, SqlGateway, Value};
use sqlflow::error::SqlFlowError;
use std::time::Duration;
use tempfile::TempDir;

async fn shop_gateway() -> (TempDir, SqlGateway) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shop.db");
    let config =
        ConnectionConfig::from_connection_string(&format!("sqlite:{}", path.display())).unwrap();
    let gateway = SqlGateway::new(config, Duration::from_secs(10));

    for statement in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), total REAL)",
        "INSERT INTO users (id, email) VALUES (1, 'ada@example.com'), (2, 'alan@example.com')",
        "INSERT INTO orders (user_id, total) VALUES (1, 9.5), (1, 20.0), (2, 3.25)",
    ] {
        gateway.execute(statement).await.unwrap();
    }

    (dir, gateway)
}

#[tokio::test]
async fn test_select_returns_rows() {
    let (_dir, gateway) = shop_gateway().await;

    let result = gateway
        .execute("SELECT id, email FROM users ORDER BY id")
        .await
        .unwrap();

    let QueryResult::Rows(rows) = result else {
        panic!("expected rows");
    };
    assert_eq!(rows.columns, vec!["id", "email"]);
    assert_eq!(
        rows.rows[0],
        vec![Value::Int(1), Value::String("ada@example.com".to_string())]
    );
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_keyword_case_and_whitespace_do_not_matter() {
    let (_dir, gateway) = shop_gateway().await;

    let result = gateway
        .execute("\n   sElEcT COUNT(*) AS n FROM orders")
        .await
        .unwrap();

    assert!(matches!(result, QueryResult::Rows(_)));
}

#[tokio::test]
async fn test_explain_is_row_producing() {
    let (_dir, gateway) = shop_gateway().await;

    let result = gateway
        .execute("EXPLAIN QUERY PLAN SELECT * FROM orders WHERE user_id = 1")
        .await
        .unwrap();

    assert!(matches!(result, QueryResult::Rows(_)));
}

#[tokio::test]
async fn test_update_is_committed_and_visible_to_next_call() {
    let (_dir, gateway) = shop_gateway().await;

    let result = gateway
        .execute("UPDATE orders SET total = total * 2 WHERE user_id = 1")
        .await
        .unwrap();
    assert_eq!(result, QueryResult::Affected(2));

    let result = gateway
        .execute("SELECT total FROM orders WHERE user_id = 1 ORDER BY id")
        .await
        .unwrap();
    let rows = result.as_rows().unwrap();
    assert_eq!(rows.rows, vec![vec![Value::Float(19.0)], vec![Value::Float(40.0)]]);
}

#[tokio::test]
async fn test_delete_reports_affected_count() {
    let (_dir, gateway) = shop_gateway().await;

    assert_eq!(
        gateway.execute("DELETE FROM orders").await.unwrap(),
        QueryResult::Affected(3)
    );
    let empty = gateway.execute("SELECT * FROM orders").await.unwrap();
    assert!(empty.as_rows().unwrap().is_empty());
}

#[tokio::test]
async fn test_schema_description_is_idempotent() {
    let (_dir, gateway) = shop_gateway().await;

    let first = gateway.describe_schema().await.unwrap();
    let second = gateway.describe_schema().await.unwrap();

    assert_eq!(first, second);
    assert!(first.contains("Table: orders"));
    assert!(first.contains("Table: users"));
    assert!(first.contains("  - email: TEXT (NOT NULL)"));
    assert!(first.contains("orders.user_id -> users.id"));
}

#[tokio::test]
async fn test_bad_sql_is_query_error() {
    let (_dir, gateway) = shop_gateway().await;

    let err = gateway.execute("SELEC * FROM users").await.unwrap_err();
    assert!(matches!(err, SqlFlowError::Query(_)));

    let err = gateway.execute("SELECT * FROM missing").await.unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_failed_write_is_not_committed() {
    let (_dir, gateway) = shop_gateway().await;

    let err = gateway
        .execute("INSERT INTO users (id, email) VALUES (3, NULL)")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFlowError::Query(_)));

    let count = gateway
        .execute("SELECT COUNT(*) AS n FROM users")
        .await
        .unwrap();
    assert_eq!(count.as_rows().unwrap().rows, vec![vec![Value::Int(2)]]);
}

#[tokio::test]
async fn test_slow_statement_becomes_timeout() {
    let (dir, _gateway) = shop_gateway().await;
    let config = ConnectionConfig::from_connection_string(&format!(
        "sqlite:{}",
        dir.path().join("shop.db").display()
    ))
    .unwrap();
    let gateway = SqlGateway::new(config, Duration::from_millis(250));

    let err = gateway
        .execute(
            "SELECT COUNT(*) FROM (WITH RECURSIVE n(x) AS \
             (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 50000000) SELECT x FROM n)",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SqlFlowError::Timeout(_)));
    assert!(err.to_string().starts_with("Timeout: Query timed out"));
}
