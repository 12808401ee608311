//! Turn orchestration.
//!
//! One turn takes a question through SQL generation, execution and
//! explanation:
//!
//! ```text
//! Idle -> GeneratingSql -> Executing -> Explaining -> Idle
//!              |               |            |
//!              +------------> Error <-------+
//! ```
//!
//! Recoverable failures in any working state are diagnosed by the LLM and
//! narrated into the transcript; the turn itself still succeeds.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::conversation::{Conversation, Message};
use super::session::Session;
use crate::config::ChatConfig;
use crate::db::{classify_statement, DatabaseGateway, QueryResult};
use crate::error::{bounded, Result, SqlFlowError};
use crate::llm::{clean_sql, LlmClient, PromptSet};

/// Response text used for a row-producing statement that returned nothing.
pub const NO_ROWS_RESPONSE: &str = "Query executed successfully. No rows returned.";

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Waiting for the next message.
    #[default]
    Idle,
    /// Asking the LLM for SQL.
    GeneratingSql,
    /// Running the generated SQL.
    Executing,
    /// Asking the LLM to explain the result.
    Explaining,
    /// Diagnosing a failure.
    Error,
}

/// What a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The input was blank; nothing happened.
    Ignored,
    /// The session is missing configuration; a notice was appended.
    Blocked {
        /// The notice appended to the transcript.
        notice: String,
    },
    /// The question was answered.
    Answered {
        /// The executed SQL.
        sql: String,
        /// What the database returned.
        result: QueryResult,
        /// The LLM's explanation of the result.
        explanation: String,
    },
    /// The turn failed and the failure was narrated.
    Failed {
        /// SQL that was generated before the failure, if any.
        attempted: Option<String>,
        /// The failure.
        error: SqlFlowError,
        /// The message appended to the transcript.
        explanation: String,
    },
}

/// Drives chat turns against a session.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    prompts: PromptSet,
    history_window: usize,
    llm_timeout: Duration,
    query_timeout: Duration,
    state: TurnState,
}

impl Orchestrator {
    /// Creates an orchestrator with the given templates and chat settings.
    pub fn new(prompts: PromptSet, chat: &ChatConfig) -> Self {
        Self {
            prompts,
            history_window: chat.history_window,
            llm_timeout: chat.llm_timeout(),
            query_timeout: chat.query_timeout(),
            state: TurnState::Idle,
        }
    }

    /// Returns the current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Runs one chat turn for `input`.
    ///
    /// Recoverable failures come back as `Ok(TurnOutcome::Failed)`. Only
    /// template and internal errors are returned as `Err`.
    pub async fn run_turn(&mut self, session: &mut Session, input: &str) -> Result<TurnOutcome> {
        let question = input.trim();
        if question.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        if let Some(notice) = session.missing_configuration() {
            warn!("Turn blocked: {}", notice);
            session.append(Message::assistant(notice.clone()));
            return Ok(TurnOutcome::Blocked { notice });
        }

        let (llm, gateway, conversation) = session
            .turn_parts()
            .ok_or_else(|| SqlFlowError::internal("Session lost its configuration mid-turn"))?;

        let start = Instant::now();
        let history = conversation.format_history(self.history_window);
        conversation.append(Message::human(question));

        let mut attempted = None;
        let outcome = match self
            .answer(llm, gateway, &history, question, &mut attempted)
            .await
        {
            Ok((sql, result, explanation)) => {
                conversation.append(Message::assistant(format!("SQL Query: {sql}")));
                conversation.append(Message::assistant(explanation.clone()));
                Ok(TurnOutcome::Answered {
                    sql,
                    result,
                    explanation,
                })
            }
            Err(error) if error.is_recoverable() => {
                self.state = TurnState::Error;
                let diagnosis = self
                    .diagnose(llm, conversation, attempted.as_deref(), question, &error)
                    .await;
                diagnosis.map(|explanation| TurnOutcome::Failed {
                    attempted,
                    error,
                    explanation,
                })
            }
            Err(error) => Err(error),
        };

        self.state = TurnState::Idle;
        info!(
            duration_ms = start.elapsed().as_millis(),
            answered = matches!(outcome, Ok(TurnOutcome::Answered { .. })),
            "Turn finished"
        );
        outcome
    }

    /// The happy path: question to SQL to result to explanation.
    async fn answer(
        &mut self,
        llm: &dyn LlmClient,
        gateway: &dyn DatabaseGateway,
        history: &str,
        question: &str,
        attempted: &mut Option<String>,
    ) -> Result<(String, QueryResult, String)> {
        self.state = TurnState::GeneratingSql;
        let schema = gateway.describe_schema().await?;
        let prompt = self.prompts.sql_generation(&schema, history, question)?;

        let started = Instant::now();
        let response = self.ask(llm, &prompt).await?;
        let sql = clean_sql(&response);
        debug!(
            sql_len = sql.len(),
            duration_ms = started.elapsed().as_millis(),
            "Generated SQL"
        );
        if sql.is_empty() {
            return Err(SqlFlowError::llm("The model returned no SQL"));
        }
        *attempted = Some(sql.clone());

        self.state = TurnState::Executing;
        let started = Instant::now();
        let result = bounded(self.query_timeout, "Query", gateway.execute(&sql)).await?;
        debug!(
            kind = ?classify_statement(&sql),
            duration_ms = started.elapsed().as_millis(),
            "Executed SQL"
        );

        self.state = TurnState::Explaining;
        let prompt = match &result {
            QueryResult::Rows(rows) => {
                let response = if rows.is_empty() {
                    NO_ROWS_RESPONSE.to_string()
                } else {
                    rows.format_for_llm()
                };
                self.prompts
                    .rows_answer(&schema, history, question, &sql, &response)?
            }
            QueryResult::Affected(count) => {
                self.prompts.affected_answer(&sql, &count.to_string())?
            }
        };
        let explanation = self.ask(llm, &prompt).await?;

        Ok((sql, result, explanation.trim().to_string()))
    }

    /// Narrates a failure into the conversation and returns what was appended.
    async fn diagnose(
        &self,
        llm: &dyn LlmClient,
        conversation: &mut Conversation,
        attempted: Option<&str>,
        question: &str,
        error: &SqlFlowError,
    ) -> Result<String> {
        warn!("{}: {}", error.category(), error);

        let query = attempted.unwrap_or(question);
        let prompt = self.prompts.error_explanation(query, &error.to_string())?;
        let explanation = match self.ask(llm, &prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Error diagnosis failed: {}", e);
                format!(
                    "{} while processing your request: {}",
                    error.category(),
                    error
                )
            }
        };

        conversation.append(Message::assistant(explanation.clone()));
        Ok(explanation)
    }

    async fn ask(&self, llm: &dyn LlmClient, prompt: &str) -> Result<String> {
        bounded(self.llm_timeout, "LLM request", llm.complete(prompt)).await
    }
}
