//! Mock database gateway for testing.
//!
//! Provides canned statement results and records every call, so tests can
//! drive the chat pipeline without a running server.

use super::{classify_statement, DatabaseGateway, QueryResult, RowSet, Schema, StatementKind};
use crate::error::{Result, SqlFlowError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    executed: Vec<String>,
    describe_calls: usize,
}

/// A mock gateway that returns predefined results.
///
/// Clones share their recorded calls.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    schema_text: String,
    outcomes: Vec<(String, std::result::Result<QueryResult, SqlFlowError>)>,
    connection_error: Option<String>,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Creates a mock gateway with an empty schema.
    pub fn new() -> Self {
        Self {
            schema_text: Schema::default().format_for_llm(),
            ..Default::default()
        }
    }

    /// Sets the schema returned by `describe_schema`.
    pub fn with_schema(mut self, schema: &Schema) -> Self {
        self.schema_text = schema.format_for_llm();
        self
    }

    /// Sets the schema text returned by `describe_schema` verbatim.
    pub fn with_schema_text(mut self, text: impl Into<String>) -> Self {
        self.schema_text = text.into();
        self
    }

    /// Returns `result` for statements containing `pattern` (case-insensitive).
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.outcomes.push((pattern.into(), Ok(result)));
        self
    }

    /// Fails statements containing `pattern` (case-insensitive) with `error`.
    pub fn with_error(mut self, pattern: impl Into<String>, error: SqlFlowError) -> Self {
        self.outcomes.push((pattern.into(), Err(error)));
        self
    }

    /// Makes every call fail as if the server were unreachable.
    pub fn failing_connection(mut self, message: impl Into<String>) -> Self {
        self.connection_error = Some(message.into());
        self
    }

    /// Delays every statement by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Returns how many times the schema was described.
    pub fn describe_calls(&self) -> usize {
        self.lock().describe_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_connection(&self) -> Result<()> {
        match &self.connection_error {
            Some(message) => Err(SqlFlowError::connection(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseGateway for MockGateway {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.lock().executed.push(sql.to_string());
        self.check_connection()?;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let sql_lower = sql.to_lowercase();
        for (pattern, outcome) in &self.outcomes {
            if sql_lower.contains(&pattern.to_lowercase()) {
                return outcome.clone();
            }
        }

        Ok(match classify_statement(sql) {
            StatementKind::RowProducing => QueryResult::Rows(RowSet::default()),
            StatementKind::Effectful => QueryResult::Affected(0),
        })
    }

    async fn describe_schema(&self) -> Result<String> {
        self.lock().describe_calls += 1;
        self.check_connection()?;
        Ok(self.schema_text.clone())
    }

    async fn check(&self) -> Result<()> {
        self.check_connection()
    }

    fn target(&self) -> String {
        "mock database".to_string()
    }
}
