//! Database abstraction layer for SQLFlow.
//!
//! Two levels live here:
//! - `DatabaseClient` wraps a single open connection of one backend.
//! - `DatabaseGateway` is what the chat pipeline talks to. `SqlGateway`
//!   opens a fresh connection for every call and closes it again before
//!   returning, whatever the outcome.

mod decode;
mod mock;
mod mysql;
mod postgres;
mod schema;
mod sqlite;
mod types;

pub use mock::MockGateway;
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{QueryResult, Row, RowSet, Value, MAX_ROWS};

use crate::config::ConnectionConfig;
use crate::error::{bounded, Result, SqlFlowError};
use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string (also accepts URL schemes).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend (0 for file-based SQLite).
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a statement yields rows or changes data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Reported back as a row set.
    RowProducing,
    /// Committed and reported as an affected-row count.
    Effectful,
}

/// Leading keywords of statements that return rows.
const ROW_PRODUCING_KEYWORDS: [&str; 4] = ["select", "show", "describe", "explain"];

/// Classifies a statement by its first keyword, ignoring case and surrounding whitespace.
pub fn classify_statement(sql: &str) -> StatementKind {
    let normalized = sql.trim().to_lowercase();
    if ROW_PRODUCING_KEYWORDS
        .iter()
        .any(|keyword| normalized.starts_with(keyword))
    {
        StatementKind::RowProducing
    } else {
        StatementKind::Effectful
    }
}

/// A single open connection to one database backend.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Runs a row-producing statement.
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet>;

    /// Runs an effectful statement in a transaction, commits it and returns the affected row count.
    async fn execute_statement(&mut self, sql: &str) -> Result<u64>;

    /// Reads table, column and foreign key metadata from the catalog.
    async fn introspect_schema(&mut self) -> Result<Schema>;

    /// Closes the connection. Further calls fail.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a connection for the configured backend.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::MySql => Ok(Box::new(MySqlClient::connect(config).await?)),
        DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(config).await?)),
    }
}

/// Runs one statement on an open client, dispatching on its kind.
pub async fn run_statement(client: &mut dyn DatabaseClient, sql: &str) -> Result<QueryResult> {
    match classify_statement(sql) {
        StatementKind::RowProducing => Ok(QueryResult::Rows(client.fetch_rows(sql).await?)),
        StatementKind::Effectful => Ok(QueryResult::Affected(
            client.execute_statement(sql).await?,
        )),
    }
}

/// The database operations the chat pipeline needs.
#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    /// Executes one SQL statement.
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    /// Returns the schema rendered as prompt text.
    async fn describe_schema(&self) -> Result<String>;

    /// Verifies that a connection can be opened.
    async fn check(&self) -> Result<()>;

    /// Returns a password-free description of the target database.
    fn target(&self) -> String;
}

/// Gateway that opens one connection per call; no pooling.
#[derive(Debug, Clone)]
pub struct SqlGateway {
    config: ConnectionConfig,
    timeout: Duration,
}

impl SqlGateway {
    /// Creates a gateway for the given connection parameters.
    pub fn new(config: ConnectionConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Returns the connection parameters.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn open(&self) -> Result<Box<dyn DatabaseClient>> {
        let target = self.config.display_string();
        bounded(self.timeout, format!("Connecting to {target}"), connect(&self.config)).await
    }

    /// Closes the client, logging rather than returning a close failure.
    async fn release(&self, mut client: Box<dyn DatabaseClient>) {
        match tokio::time::timeout(self.timeout, client.close()).await {
            Ok(Ok(())) => debug!("Connection closed"),
            Ok(Err(e)) => warn!("Failed to close connection cleanly: {}", e),
            Err(_) => warn!("Closing the connection timed out, dropping it"),
        }
    }
}

#[async_trait]
impl DatabaseGateway for SqlGateway {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let kind = classify_statement(sql);
        let mut client = self.open().await?;

        let result = bounded(
            self.timeout,
            "Query".to_string(),
            run_statement(client.as_mut(), sql),
        )
        .await;
        self.release(client).await;

        match &result {
            Ok(QueryResult::Rows(rows)) => debug!(
                ?kind,
                rows = rows.len(),
                duration_ms = start.elapsed().as_millis(),
                "Statement returned rows"
            ),
            Ok(QueryResult::Affected(count)) => debug!(
                ?kind,
                affected = count,
                duration_ms = start.elapsed().as_millis(),
                "Statement committed"
            ),
            Err(e) => debug!(?kind, error = %e, "Statement failed"),
        }
        result
    }

    async fn describe_schema(&self) -> Result<String> {
        let mut client = self.open().await?;
        let schema = bounded(
            self.timeout,
            "Schema introspection".to_string(),
            client.introspect_schema(),
        )
        .await;
        self.release(client).await;

        let schema = schema?;
        debug!(tables = schema.tables.len(), "Introspected schema");
        Ok(schema.format_for_llm())
    }

    async fn check(&self) -> Result<()> {
        let client = self.open().await?;
        self.release(client).await;
        Ok(())
    }

    fn target(&self) -> String {
        self.config.display_string()
    }
}

/// Maps driver connection errors to user-facing messages.
pub(crate) fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SqlFlowError {
    let host = config.host_or_default();
    let port = config.port_or_default();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SqlFlowError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied")
        || error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SqlFlowError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if (error_str.contains("unknown database") || error_str.contains("does not exist"))
        && error_str.contains("database")
    {
        SqlFlowError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("unable to open database file") {
        SqlFlowError::connection(format!("Cannot open SQLite database '{database}'."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlFlowError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SqlFlowError::connection(error.to_string())
    }
}

/// Formats a statement error, preferring the server's own message.
pub(crate) fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR ({}): {}", code, db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
