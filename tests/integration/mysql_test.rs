//! MySQL gateway tests.

use super::gateway_from_env;
use pretty_assertions::assert_eq;
use sqlflow::db::{DatabaseGateway, QueryResult, SqlGateway, Value};
use sqlflow::error::SqlFlowError;

const URL_VAR: &str = "MYSQL_TEST_URL";

async fn scratch_table(gateway: &SqlGateway, name: &str) {
    gateway
        .execute(&format!("DROP TABLE IF EXISTS {name}"))
        .await
        .unwrap();
    gateway
        .execute(&format!(
            "CREATE TABLE {name} (id INT PRIMARY KEY, label VARCHAR(32) NOT NULL, amount DECIMAL(10,2))"
        ))
        .await
        .unwrap();
    gateway
        .execute(&format!(
            "INSERT INTO {name} VALUES (1, 'a', 1.50), (2, 'b', NULL), (3, 'c', 7.25)"
        ))
        .await
        .unwrap();
}

async fn drop_table(gateway: &SqlGateway, name: &str) {
    gateway
        .execute(&format!("DROP TABLE IF EXISTS {name}"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mysql_select_and_show() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };
    scratch_table(&gateway, "sqlflow_it_select").await;

    let result = gateway
        .execute("SELECT id, label, amount FROM sqlflow_it_select ORDER BY id")
        .await
        .unwrap();
    let rows = result.as_rows().unwrap();
    assert_eq!(rows.columns, vec!["id", "label", "amount"]);
    assert_eq!(rows.rows[0][0], Value::Int(1));
    assert_eq!(rows.rows[0][1], Value::String("a".to_string()));
    assert!(rows.rows[1][2].is_null());

    let tables = gateway.execute("SHOW TABLES").await.unwrap();
    assert!(matches!(tables, QueryResult::Rows(ref r) if !r.is_empty()));

    drop_table(&gateway, "sqlflow_it_select").await;
}

#[tokio::test]
async fn test_mysql_delete_is_committed() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };
    scratch_table(&gateway, "sqlflow_it_delete").await;

    let result = gateway
        .execute("DELETE FROM sqlflow_it_delete WHERE id > 1")
        .await
        .unwrap();
    assert_eq!(result, QueryResult::Affected(2));

    let count = gateway
        .execute("SELECT COUNT(*) AS n FROM sqlflow_it_delete")
        .await
        .unwrap();
    assert_eq!(count.as_rows().unwrap().rows, vec![vec![Value::Int(1)]]);

    drop_table(&gateway, "sqlflow_it_delete").await;
}

#[tokio::test]
async fn test_mysql_schema_lists_scratch_table() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };
    scratch_table(&gateway, "sqlflow_it_schema").await;

    let first = gateway.describe_schema().await.unwrap();
    let second = gateway.describe_schema().await.unwrap();
    assert_eq!(first, second);
    assert!(first.contains("Table: sqlflow_it_schema"));
    assert!(first.contains("  - id: int"));
    assert!(first.contains("(PK, NOT NULL)"));

    drop_table(&gateway, "sqlflow_it_schema").await;
}

#[tokio::test]
async fn test_mysql_syntax_error_is_query_error() {
    let Some(gateway) = gateway_from_env(URL_VAR) else {
        eprintln!("Skipping test: {URL_VAR} not set");
        return;
    };

    let err = gateway.execute("SELEC 1").await.unwrap_err();
    assert!(matches!(err, SqlFlowError::Query(_)));
    assert!(err.to_string().contains("1064"));
}
