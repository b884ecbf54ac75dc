//! LLM integration for Parley.
//!
//! Provides the completion trait and implementations for communicating with
//! the LLM provider. The trait is the seam the agent is built on, so tests
//! can swap in a deterministic client.

pub mod factory;
pub mod groq;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod types;

pub use factory::create_client;
pub use groq::{GroqClient, GroqConfig};
pub use mock::MockLlmClient;
pub use parser::{parse_reply, ParsedReply};
pub use prompt::{build_messages, build_system_prompt};
pub use types::{Message, Role};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::QueryError;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async
/// operations. Failures use the query-error kinds so they surface in chat
/// without translation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// Returns the complete response as a single string. The call blocks
    /// until the remote service answers or the configured timeout expires;
    /// it is never retried.
    async fn complete(&self, messages: &[Message]) -> Result<String, QueryError>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq-hosted models (Llama 3 family).
    #[default]
    Groq,
    /// Mock client for testing (no API key required).
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {s}")),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("groq".parse::<LlmProvider>().unwrap(), LlmProvider::Groq);
        assert_eq!("Groq".parse::<LlmProvider>().unwrap(), LlmProvider::Groq);
        assert_eq!("mock".parse::<LlmProvider>().unwrap(), LlmProvider::Mock);
        assert!("unknown".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(format!("{}", LlmProvider::Groq), "groq");
        assert_eq!(LlmProvider::default(), LlmProvider::Groq);
    }

    #[tokio::test]
    async fn test_mock_client_implements_trait() {
        let client: Box<dyn LlmClient> = Box::new(MockLlmClient::new());
        let messages = vec![Message::user("Show me all users")];
        let response = client.complete(&messages).await.unwrap();
        assert!(response.contains("SELECT"));
    }
}
