//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Result, SqlFlowError};
use crate::llm::{
    GeminiClient, GeminiConfig, LlmClient, LlmProvider, MockLlmClient, OllamaClient,
    OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client from the configured provider settings.
///
/// The API key is resolved in order:
/// 1. `api_key` parameter (`--api-key` or `/key`)
/// 2. `api_key` in the config file
/// 3. The provider's environment variables (`GEMINI_API_KEY`, `GOOGLE_API_KEY`, `OPENAI_API_KEY`)
///
/// A provider that needs a key but has none yields a `Config` error.
pub fn create_client(
    config: &LlmConfig,
    api_key: Option<String>,
    timeout: Duration,
) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(SqlFlowError::config)?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let timeout_secs = timeout.as_secs().max(1);

    match provider {
        LlmProvider::Gemini => {
            let key = resolve_api_key(provider, api_key, config.api_key.clone())?;
            Ok(Box::new(GeminiClient::new(
                GeminiConfig::new(key, model).with_timeout(timeout_secs),
            )?))
        }
        LlmProvider::OpenAi => {
            let key = resolve_api_key(provider, api_key, config.api_key.clone())?;
            Ok(Box::new(OpenAiClient::new(
                OpenAiConfig::new(key, model).with_timeout(timeout_secs),
            )?))
        }
        LlmProvider::Ollama => {
            let mut ollama = OllamaConfig::new(model).with_timeout(timeout_secs);
            if let Some(url) = config
                .ollama_url
                .clone()
                .or_else(|| std::env::var("OLLAMA_URL").ok())
            {
                ollama = ollama.with_url(url);
            }
            Ok(Box::new(OllamaClient::new(ollama)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn resolve_api_key(
    provider: LlmProvider,
    explicit: Option<String>,
    configured: Option<String>,
) -> Result<String> {
    explicit
        .or(configured)
        .or_else(|| {
            provider
                .api_key_env_vars()
                .iter()
                .find_map(|var| std::env::var(var).ok())
        })
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            SqlFlowError::config(format!(
                "No API key configured. Use /key <key> or set {}.",
                provider.api_key_env_vars().join(" or ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_client() {
        let client = create_client(&llm_config("mock"), None, Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let result = create_client(&llm_config("anthropic"), None, Duration::from_secs(5));
        assert!(matches!(result.err(), Some(SqlFlowError::Config(_))));
    }

    #[test]
    fn test_create_openai_without_key_fails() {
        // Temporarily unset the env var if it exists
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = create_client(&llm_config("openai"), None, Duration::from_secs(5));
        let err = result.err().unwrap();
        assert!(matches!(err, SqlFlowError::Config(_)));
        assert!(err.to_string().contains("No API key configured"));

        // Restore
        if let Some(key) = original {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }

    #[test]
    fn test_explicit_key_wins() {
        let result = create_client(
            &llm_config("gemini"),
            Some("test-key".to_string()),
            Duration::from_secs(5),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_configured_key_is_used() {
        let config = LlmConfig {
            api_key: Some("from-config".to_string()),
            ..llm_config("openai")
        };
        assert!(create_client(&config, None, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = resolve_api_key(LlmProvider::OpenAi, Some("  ".to_string()), None);
        assert!(result.is_err());

        if let Some(key) = original {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        assert!(create_client(&llm_config("ollama"), None, Duration::from_secs(5)).is_ok());
    }
}
