//! Interactive chat loop.
//!
//! Reads one line at a time; slash commands are handled locally, everything
//! else becomes a chat turn. Each turn runs to completion before the next
//! line is read.

mod commands;
mod render;

pub use commands::{parse_command, Command, HELP_TEXT};
pub use render::{format_outcome, format_result, format_table, format_transcript, FAILURE_BANNER};

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};

use crate::chat::{Orchestrator, Session, TurnOutcome};
use crate::config::{ChatConfig, ConnectionConfig, LlmConfig};
use crate::error::{Result, SqlFlowError};
use crate::llm::create_client;

const PROMPT: &str = "sqlflow> ";

/// An interactive chat session bound to its settings.
pub struct Repl {
    session: Session,
    orchestrator: Orchestrator,
    llm_config: LlmConfig,
    chat_config: ChatConfig,
}

impl Repl {
    /// Creates a REPL around an already configured session.
    pub fn new(
        session: Session,
        orchestrator: Orchestrator,
        llm_config: LlmConfig,
        chat_config: ChatConfig,
    ) -> Self {
        Self {
            session,
            orchestrator,
            llm_config,
            chat_config,
        }
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs a single chat turn and returns the rendered reply.
    pub async fn ask(&mut self, question: &str) -> Result<(TurnOutcome, String)> {
        let outcome = self
            .orchestrator
            .run_turn(&mut self.session, question)
            .await?;
        let text = format_outcome(&outcome);
        Ok((outcome, text))
    }

    /// Reads lines from `input` until end of input or `/quit`.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        write_block(output, &format_transcript(self.session.conversation()))?;
        if let Some(notice) = self.session.missing_configuration() {
            write_block(output, &format!("Warning: {notice}"))?;
        }

        let mut lines = input.lines();
        loop {
            write!(output, "{PROMPT}").map_err(io_error)?;
            output.flush().map_err(io_error)?;

            let Some(line) = lines.next_line().await.map_err(io_error)? else {
                break;
            };

            let reply = match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(command) => self.handle_command(command).await,
                None => match self.ask(&line).await {
                    Ok((_, text)) => text,
                    Err(e) => {
                        error!("{}: {}", e.category(), e);
                        format!("{}: {}", e.category(), e)
                    }
                },
            };

            if !reply.is_empty() {
                write_block(output, &reply)?;
            }
        }

        info!("Chat ended");
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::History => format_transcript(self.session.conversation()),
            Command::Schema => match self.session.gateway() {
                Some(gateway) => gateway
                    .describe_schema()
                    .await
                    .unwrap_or_else(|e| format!("{}: {}", e.category(), e)),
                None => "Not connected to a database.".to_string(),
            },
            Command::Connect(conn_str) => match self.connect(&conn_str).await {
                Ok(target) => format!("Connected to {target}."),
                Err(e) => format!("{}: {}", e.category(), e),
            },
            Command::Key(key) => {
                match create_client(&self.llm_config, Some(key), self.chat_config.llm_timeout()) {
                    Ok(client) => {
                        self.session.set_llm(client);
                        info!(provider = %self.llm_config.provider, "LLM client configured");
                        format!("API key set for {}.", self.llm_config.provider)
                    }
                    Err(e) => format!("{}: {}", e.category(), e),
                }
            }
            Command::Usage(usage) => usage.to_string(),
            Command::Unknown(name) => {
                format!("Unknown command: /{name}. Type /help for available commands.")
            }
            Command::Quit => String::new(),
        }
    }

    async fn connect(&mut self, conn_str: &str) -> Result<String> {
        let mut config = ConnectionConfig::from_connection_string(conn_str)?;
        config.apply_env_defaults();
        self.session
            .connect(config, self.chat_config.query_timeout())
            .await
    }
}

fn write_block<W: Write>(output: &mut W, text: &str) -> Result<()> {
    writeln!(output, "{text}\n").map_err(io_error)
}

fn io_error(e: std::io::Error) -> SqlFlowError {
    SqlFlowError::internal(format!("Terminal I/O failed: {e}"))
}
