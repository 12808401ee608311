//! PostgreSQL gateway tests.

use super::gateway_from_env;
use pretty_assertions::assert_eq;
use sqlflow::db::{DatabaseGateway, QueryResult, Value};
use sqlflow::error::SqlFlowError;

const URL_VAR: &str = "DATABASE_URL";

#[tokio::test]
async fn test_postgres_round_trip() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };

    gateway
        .execute("DROP TABLE IF EXISTS sqlflow_it_items")
        .await
        .unwrap();
    gateway
        .execute("CREATE TABLE sqlflow_it_items (id SERIAL PRIMARY KEY, name TEXT NOT NULL, active BOOLEAN)")
        .await
        .unwrap();

    let inserted = gateway
        .execute("INSERT INTO sqlflow_it_items (name, active) VALUES ('x', true), ('y', false)")
        .await
        .unwrap();
    assert_eq!(inserted, QueryResult::Affected(2));

    let rows = gateway
        .execute("SELECT name, active FROM sqlflow_it_items ORDER BY id")
        .await
        .unwrap();
    let rows = rows.as_rows().unwrap();
    assert_eq!(
        rows.rows,
        vec![
            vec![Value::String("x".to_string()), Value::Bool(true)],
            vec![Value::String("y".to_string()), Value::Bool(false)],
        ]
    );

    let schema = gateway.describe_schema().await.unwrap();
    assert!(schema.contains("Table: sqlflow_it_items"));
    assert!(schema.contains("  - name: text (NOT NULL)"));

    gateway
        .execute("DROP TABLE sqlflow_it_items")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_explain_is_row_producing() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };

    let result = gateway.execute("EXPLAIN SELECT 1").await.unwrap();
    assert!(matches!(result, QueryResult::Rows(ref r) if !r.is_empty()));
}

#[tokio::test]
async fn test_postgres_missing_table() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };

    let err = gateway
        .execute("SELECT * FROM sqlflow_it_does_not_exist")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFlowError::Query(_)));
    assert!(err.to_string().contains("sqlflow_it_does_not_exist"));
}

#[tokio::test]
async fn test_postgres_composite_foreign_key_pairs_columns() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };

    for statement in [
        "DROP TABLE IF EXISTS sqlflow_it_lines",
        "DROP TABLE IF EXISTS sqlflow_it_products",
        "CREATE TABLE sqlflow_it_products (id INT, variant TEXT, PRIMARY KEY (id, variant))",
        "CREATE TABLE sqlflow_it_lines (line_id INT PRIMARY KEY, product_id INT, variant TEXT, \
         FOREIGN KEY (product_id, variant) REFERENCES sqlflow_it_products (id, variant))",
    ] {
        gateway.execute(statement).await.unwrap();
    }

    let first = gateway.describe_schema().await.unwrap();
    let second = gateway.describe_schema().await.unwrap();
    assert_eq!(first, second);
    assert!(first.contains(
        "  - sqlflow_it_lines.product_id, variant -> sqlflow_it_products.id, variant\n"
    ));
    assert_eq!(first.matches("sqlflow_it_lines.").count(), 1);

    for statement in [
        "DROP TABLE sqlflow_it_lines",
        "DROP TABLE sqlflow_it_products",
    ] {
        gateway.execute(statement).await.unwrap();
    }
}
