//! SQLite database client implementation.
//!
//! The connection's `database` field holds the database file path.

use crate::config::ConnectionConfig;
use crate::db::decode::convert_rows;
use crate::db::schema::{foreign_keys_from_catalog, tables_from_catalog};
use crate::db::{format_query_error, map_connection_error, DatabaseClient, RowSet, Schema};
use crate::error::{Result, SqlFlowError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

/// SQLite database client holding one open connection.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Option<SqliteConnection>,
}

impl SqliteClient {
    /// Opens the database file, creating it if it does not exist.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn = SqliteConnectOptions::new()
            .filename(config.require_database()?)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| map_connection_error(e, config))?;
        debug!("Connected to {}", config.display_string());

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlFlowError::internal("SQLite connection already closed"))
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet> {
        let conn = self.conn()?;
        let rows = conn
            .fetch_all(sqlx::raw_sql(sql))
            .await
            .map_err(|e| SqlFlowError::query(format_query_error(&e)))?;
        Ok(convert_rows(&rows))
    }

    async fn execute_statement(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn()?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| SqlFlowError::query(format_query_error(&e)))?;
        let done = tx
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| SqlFlowError::query(format_query_error(&e)))?;
        tx.commit()
            .await
            .map_err(|e| SqlFlowError::query(format_query_error(&e)))?;
        Ok(done.rows_affected())
    }

    async fn introspect_schema(&mut self) -> Result<Schema> {
        let conn = self.conn()?;

        let columns: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT m.name, p.name, p.type, p."notnull", p.pk
            FROM sqlite_master m
            JOIN pragma_table_info(m.name) p
            WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
            ORDER BY m.name, p.cid
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch columns: {e}")))?;

        let foreign_keys: Vec<(String, String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT m.name, CAST(f.id AS TEXT), f."from", f."table", f."to"
            FROM sqlite_master m
            JOIN pragma_foreign_key_list(m.name) f
            WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
            ORDER BY m.name, f.id, f.seq
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch foreign keys: {e}")))?;

        let tables = tables_from_catalog(columns.into_iter().map(
            |(table, column, data_type, not_null, pk)| (table, column, data_type, not_null == 0, pk > 0),
        ));

        let mut keys = foreign_keys_from_catalog(foreign_keys.into_iter().map(
            |(table, id, from, to_table, to)| (table, id, from, to_table, to.unwrap_or_default()),
        ));

        // A reference without explicit columns targets the parent's primary key.
        for fk in &mut keys {
            if fk.to_columns.iter().all(String::is_empty) {
                if let Some(parent) = tables.iter().find(|t| t.name == fk.to_table) {
                    fk.to_columns = parent.primary_key.clone();
                }
            }
        }

        Ok(Schema::new(tables, keys))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| SqlFlowError::connection(format!("Failed to close connection: {e}")))?;
        }
        Ok(())
    }
}
