//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! for MySQL and MariaDB using a single sqlx connection.

use crate::config::ConnectionConfig;
use crate::db::decode::convert_rows;
use crate::db::schema::{foreign_keys_from_catalog, tables_from_catalog};
use crate::db::{format_query_error, map_connection_error, DatabaseClient, RowSet, Schema};
use crate::error::{Result, SqlFlowError};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

/// MySQL database client holding one open connection.
#[derive(Debug)]
pub struct MySqlClient {
    conn: Option<MySqlConnection>,
}

impl MySqlClient {
    /// Opens a connection using the given parameters.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(config.host_or_default())
            .port(config.port_or_default())
            .database(config.require_database()?);
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| map_connection_error(e, config))?;
        debug!("Connected to {}", config.display_string());

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlFlowError::internal("MySQL connection already closed"))
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
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

        let columns: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(c.table_name AS CHAR),
                CAST(c.column_name AS CHAR),
                CAST(c.column_type AS CHAR),
                CAST(c.is_nullable AS CHAR),
                CAST(c.column_key AS CHAR)
            FROM information_schema.columns c
            JOIN information_schema.tables t
                ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE c.table_schema = DATABASE() AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch columns: {e}")))?;

        let foreign_keys: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(table_name AS CHAR),
                CAST(constraint_name AS CHAR),
                CAST(column_name AS CHAR),
                CAST(referenced_table_name AS CHAR),
                CAST(referenced_column_name AS CHAR)
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL
            ORDER BY table_name, constraint_name, ordinal_position
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch foreign keys: {e}")))?;

        let tables = tables_from_catalog(columns.into_iter().map(
            |(table, column, data_type, nullable, key)| {
                (table, column, data_type, nullable == "YES", key == "PRI")
            },
        ));

        Ok(Schema::new(tables, foreign_keys_from_catalog(foreign_keys)))
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
