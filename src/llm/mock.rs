//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus a queue of
//! scripted replies. Every prompt is recorded.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Result, SqlFlowError};
use crate::llm::LlmClient;

type Reply = std::result::Result<String, SqlFlowError>;

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Reply>,
    prompts: Vec<String>,
}

/// Mock LLM client that returns canned responses.
///
/// Resolution order: scripted replies (first in, first out), then pattern
/// rules, then the built-in defaults. Clones share their script and recorded prompts.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> reply).
    rules: Vec<(String, Reply)>,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the prompt contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.rules.push((pattern.into(), Ok(response.into())));
        self
    }

    /// Fails prompts containing `pattern` with `error`.
    pub fn with_error(mut self, pattern: impl Into<String>, error: SqlFlowError) -> Self {
        self.rules.push((pattern.into(), Err(error)));
        self
    }

    /// Queues replies returned by the next calls, in order.
    pub fn with_script<S: Into<String>>(self, replies: impl IntoIterator<Item = S>) -> Self {
        self.lock()
            .script
            .extend(replies.into_iter().map(|r| Ok(r.into())));
        self
    }

    /// Queues a failure for the next unscripted call.
    pub fn then_fail(self, error: SqlFlowError) -> Self {
        self.lock().script.push_back(Err(error));
        self
    }

    /// Waits `delay` before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Returns the number of completed or attempted calls.
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generates a mock response based on the prompt.
    fn mock_response(&self, prompt: &str) -> Reply {
        let prompt_lower = prompt.to_lowercase();

        for (pattern, reply) in &self.rules {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return reply.clone();
            }
        }

        match question_of(prompt) {
            Some(question) => Ok(default_sql(&question.to_lowercase())),
            None => Ok("This is a mock answer; no language model was called.".to_string()),
        }
    }
}

/// Returns the user's request from a SQL generation prompt, if this is one.
fn question_of(prompt: &str) -> Option<&str> {
    let (_, rest) = prompt.rsplit_once("User Request:")?;
    rest.lines().next().map(str::trim)
}

fn default_sql(question: &str) -> String {
    if question.contains("tables") {
        return "```sql\nSHOW TABLES;\n```".to_string();
    }

    if question.contains("count") && question.contains("orders") {
        return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
    }

    if question.contains("count") && question.contains("users") {
        return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
    }

    if question.contains("all users") || question.contains("show users") {
        return "```sql\nSELECT * FROM users;\n```".to_string();
    }

    if question.contains("delete") && question.contains("orders") {
        return "```sql\nDELETE FROM orders;\n```".to_string();
    }

    "SELECT 1;".to_string()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let scripted = {
            let mut state = self.lock();
            state.prompts.push(prompt.to_string());
            state.script.pop_front()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        scripted.unwrap_or_else(|| self.mock_response(prompt))
    }
}
