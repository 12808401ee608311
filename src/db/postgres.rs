//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using a single sqlx connection.

use crate::config::ConnectionConfig;
use crate::db::decode::convert_rows;
use crate::db::schema::{foreign_keys_from_catalog, tables_from_catalog};
use crate::db::{format_query_error, map_connection_error, DatabaseClient, RowSet, Schema};
use crate::error::{Result, SqlFlowError};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgDatabaseError};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::debug;

/// PostgreSQL database client holding one open connection.
#[derive(Debug)]
pub struct PostgresClient {
    conn: Option<PgConnection>,
}

impl PostgresClient {
    /// Opens a connection using the given parameters.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = PgConnectOptions::new()
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

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlFlowError::internal("PostgreSQL connection already closed"))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet> {
        let conn = self.conn()?;
        let rows = conn
            .fetch_all(sqlx::raw_sql(sql))
            .await
            .map_err(|e| SqlFlowError::query(format_pg_error(&e)))?;
        Ok(convert_rows(&rows))
    }

    async fn execute_statement(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn()?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| SqlFlowError::query(format_pg_error(&e)))?;
        let done = tx
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| SqlFlowError::query(format_pg_error(&e)))?;
        tx.commit()
            .await
            .map_err(|e| SqlFlowError::query(format_pg_error(&e)))?;
        Ok(done.rows_affected())
    }

    async fn introspect_schema(&mut self) -> Result<Schema> {
        let conn = self.conn()?;

        let columns: Vec<(String, String, String, bool, bool)> = sqlx::query_as(
            r#"
            SELECT
                c.table_name::text,
                c.column_name::text,
                c.data_type::text,
                c.is_nullable = 'YES',
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                        AND tc.table_schema = c.table_schema
                        AND tc.table_name = c.table_name
                        AND kcu.column_name = c.column_name
                )
            FROM information_schema.columns c
            JOIN information_schema.tables t
                ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE c.table_schema = 'public' AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch columns: {e}")))?;

        // conkey and confkey are parallel arrays, unnested together to keep columns paired
        let foreign_keys: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                src.relname::text,
                con.conname::text,
                src_col.attname::text,
                dst.relname::text,
                dst_col.attname::text
            FROM pg_constraint con
            JOIN pg_class src ON src.oid = con.conrelid
            JOIN pg_namespace ns ON ns.oid = src.relnamespace
            JOIN pg_class dst ON dst.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(src_attnum, dst_attnum, position)
            JOIN pg_attribute src_col
                ON src_col.attrelid = con.conrelid AND src_col.attnum = k.src_attnum
            JOIN pg_attribute dst_col
                ON dst_col.attrelid = con.confrelid AND dst_col.attnum = k.dst_attnum
            WHERE con.contype = 'f' AND ns.nspname = 'public'
            ORDER BY src.relname, con.conname, k.position
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlFlowError::query(format!("Failed to fetch foreign keys: {e}")))?;

        Ok(Schema::new(
            tables_from_catalog(columns),
            foreign_keys_from_catalog(foreign_keys),
        ))
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

/// Formats a statement error, adding PostgreSQL detail and hint lines when present.
fn format_pg_error(error: &sqlx::Error) -> String {
    let mut result = format_query_error(error);

    let Some(pg_error) = error
        .as_database_error()
        .and_then(|db_error| db_error.try_downcast_ref::<PgDatabaseError>())
    else {
        return result;
    };

    let extras = [
        ("DETAIL", pg_error.detail()),
        ("HINT", pg_error.hint()),
        ("TABLE", pg_error.table()),
        ("COLUMN", pg_error.column()),
        ("CONSTRAINT", pg_error.constraint()),
    ];
    for (label, value) in extras {
        if let Some(value) = value {
            result.push_str(&format!("\n  {label}: {value}"));
        }
    }
    result
}
