//! LLM integration for SQLFlow.
//!
//! Provides the `LlmClient` trait and implementations for the supported providers.
//! Every call is a single stateless prompt-in, text-out completion.

pub mod factory;
mod gemini;
mod mock;
mod ollama;
mod openai;
pub mod parser;
pub mod prompt;

pub use factory::create_client;
pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::clean_sql;
pub use prompt::{PromptSet, PromptTemplate, TemplateKind};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::{Result, SqlFlowError};

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt and returns the model's complete text answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Google Gemini
    #[default]
    Gemini,
    /// OpenAI (GPT-4o, etc.)
    OpenAi,
    /// Local Ollama instance
    Ollama,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }

    /// Returns the model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "llama3.2:3b",
            Self::Mock => "mock",
        }
    }

    /// Returns the environment variables consulted for an API key, in order.
    pub fn api_key_env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Ollama | Self::Mock => &[],
        }
    }

    /// Returns true if the provider cannot be used without an API key.
    pub fn requires_api_key(&self) -> bool {
        !self.api_key_env_vars().is_empty()
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a transport-level reqwest failure to a user-facing error.
pub(crate) fn map_request_error(error: reqwest::Error, provider: &str) -> SqlFlowError {
    if error.is_timeout() {
        SqlFlowError::timeout(format!("{provider} request timed out"))
    } else if error.is_connect() {
        SqlFlowError::llm(format!(
            "Failed to connect to {provider}. Check your network."
        ))
    } else {
        SqlFlowError::llm(format!("Request failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!(
            "gemini".parse::<LlmProvider>().unwrap(),
            LlmProvider::Gemini
        );
        assert_eq!(
            "OpenAI".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAi
        );
        assert_eq!(
            "ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("anthropic".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_provider_display_and_default() {
        assert_eq!(format!("{}", LlmProvider::OpenAi), "openai");
        assert_eq!(LlmProvider::default(), LlmProvider::Gemini);
        assert_eq!(LlmProvider::Gemini.default_model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_key_requirements() {
        assert!(LlmProvider::Gemini.requires_api_key());
        assert!(LlmProvider::OpenAi.requires_api_key());
        assert!(!LlmProvider::Ollama.requires_api_key());
        assert!(!LlmProvider::Mock.requires_api_key());
    }

    #[tokio::test]
    async fn test_mock_client_implements_trait() {
        let client: Box<dyn LlmClient> =
            Box::new(MockLlmClient::new().with_response("users", "SELECT * FROM users;"));
        let response = client.complete("Show me all users").await.unwrap();
        assert!(response.contains("SELECT"));
    }
}
