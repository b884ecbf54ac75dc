//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::ConnectionError;
use crate::llm::{GroqClient, GroqConfig, LlmClient, LlmProvider, MockLlmClient};

/// Creates an LLM client for the given settings.
///
/// The API key is resolved in order:
/// 1. `api_key` from the config
/// 2. `GROQ_API_KEY` environment variable
///
/// A missing or empty key is a configuration failure, reported before any
/// network activity so the connect form can surface it.
pub fn create_client(
    provider: LlmProvider,
    config: &LlmConfig,
) -> Result<Box<dyn LlmClient>, ConnectionError> {
    match provider {
        LlmProvider::Groq => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()))
                .ok_or_else(|| {
                    ConnectionError::InvalidConfig(
                        "No API key configured. Set GROQ_API_KEY or [llm] api_key.".to_string(),
                    )
                })?;

            let groq_config =
                GroqConfig::new(key, config.model.clone()).with_timeout(config.timeout_secs);
            let client = GroqClient::new(groq_config).map_err(|e| {
                ConnectionError::InvalidConfig(format!("Failed to create LLM client: {e}"))
            })?;
            Ok(Box::new(client))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
