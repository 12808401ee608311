//! Session-scoped chat context.
//!
//! A `Session` owns everything one chat needs: the connection parameters,
//! the database gateway built from them, the configured LLM client and the
//! transcript. It lives as long as the REPL.

use std::time::Duration;
use tracing::info;

use super::conversation::{Conversation, Message};
use crate::config::ConnectionConfig;
use crate::db::{DatabaseGateway, SqlGateway};
use crate::error::Result;
use crate::llm::LlmClient;

/// Notice shown when no LLM client is configured.
pub const MISSING_LLM_NOTICE: &str =
    "LLM API key not set. Use /key <api-key> or set GEMINI_API_KEY to continue.";

/// Notice shown when no database connection is configured.
pub const MISSING_DATABASE_NOTICE: &str =
    "Not connected to a database. Use /connect <connection-string> to continue.";

/// Everything one chat session needs.
pub struct Session {
    connection: Option<ConnectionConfig>,
    gateway: Option<Box<dyn DatabaseGateway>>,
    llm: Option<Box<dyn LlmClient>>,
    conversation: Conversation,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("gateway", &self.gateway.as_ref().map(|g| g.target()))
            .field("llm", &self.llm.is_some())
            .field("messages", &self.conversation.len())
            .finish()
    }
}

impl Session {
    /// Creates an unconfigured session whose transcript holds the greeting.
    pub fn new() -> Self {
        Self {
            connection: None,
            gateway: None,
            llm: None,
            conversation: Conversation::with_greeting(),
        }
    }

    /// Installs the LLM client, replacing any previous one.
    pub fn set_llm(&mut self, llm: Box<dyn LlmClient>) {
        self.llm = Some(llm);
    }

    /// Installs a gateway directly (tests and custom backends).
    pub fn set_gateway(&mut self, gateway: Box<dyn DatabaseGateway>) {
        self.gateway = Some(gateway);
    }

    /// Verifies the connection parameters and, on success, makes them current.
    ///
    /// On failure the previous connection stays in place.
    pub async fn connect(&mut self, config: ConnectionConfig, timeout: Duration) -> Result<String> {
        let gateway = SqlGateway::new(config.clone(), timeout);
        gateway.check().await?;

        let target = gateway.target();
        info!("Connected to {}", target);
        self.connection = Some(config);
        self.gateway = Some(Box::new(gateway));
        Ok(target)
    }

    /// Returns the current connection parameters.
    pub fn connection(&self) -> Option<&ConnectionConfig> {
        self.connection.as_ref()
    }

    /// Returns the database gateway, if connected.
    pub fn gateway(&self) -> Option<&dyn DatabaseGateway> {
        self.gateway.as_deref()
    }

    /// Returns the LLM client, if configured.
    pub fn llm(&self) -> Option<&dyn LlmClient> {
        self.llm.as_deref()
    }

    /// Returns true if both an LLM client and a database are configured.
    pub fn is_ready(&self) -> bool {
        self.missing_configuration().is_none()
    }

    /// Describes what is still missing before a turn can run.
    pub fn missing_configuration(&self) -> Option<String> {
        let missing: Vec<&str> = [
            self.llm.is_none().then_some(MISSING_LLM_NOTICE),
            self.gateway.is_none().then_some(MISSING_DATABASE_NOTICE),
        ]
        .into_iter()
        .flatten()
        .collect();

        (!missing.is_empty()).then(|| missing.join(" "))
    }

    /// Returns the transcript.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Appends a message to the transcript.
    pub(crate) fn append(&mut self, message: Message) {
        self.conversation.append(message);
    }

    /// Splits the session into the parts a turn works with.
    pub(crate) fn turn_parts(
        &mut self,
    ) -> Option<(&dyn LlmClient, &dyn DatabaseGateway, &mut Conversation)> {
        match (&self.llm, &self.gateway) {
            (Some(llm), Some(gateway)) => {
                Some((llm.as_ref(), gateway.as_ref(), &mut self.conversation))
            }
            _ => None,
        }
    }
}
