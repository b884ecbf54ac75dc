//! Groq LLM client implementation.
//!
//! Implements the LlmClient trait against Groq's OpenAI-compatible
//! chat-completions API. Requests are sent once and never retried; a failed
//! call surfaces immediately as the next chat turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::QueryError;
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Groq API endpoint (OpenAI-compatible).
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq client configuration.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "llama3-8b-8192").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl GroqConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Groq LLM client.
#[derive(Debug, Clone)]
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
}

impl GroqClient {
    /// Creates a new Groq client with the given configuration.
    pub fn new(config: GroqConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                QueryError::GenerationFailure(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `GROQ_API_KEY` for the API key.
    /// Optionally reads `GROQ_MODEL` for the model (defaults to
    /// "llama3-8b-8192").
    pub fn from_env() -> Result<Self, QueryError> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            QueryError::GenerationFailure("GROQ_API_KEY environment variable not set".to_string())
        })?;

        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| "llama3-8b-8192".to_string());

        Self::new(GroqConfig::new(api_key, model))
    }

    /// Converts internal messages to the wire format.
    fn convert_messages(messages: &[Message]) -> Vec<GroqMessage> {
        messages
            .iter()
            .map(|m| GroqMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Turns a non-success API response into a query error.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> QueryError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return QueryError::GenerationFailure(
                "Authentication failed. Check your GROQ_API_KEY.".to_string(),
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return QueryError::GenerationFailure(
                "Rate limited by the API. Please wait and ask again.".to_string(),
            );
        }

        // Surface the provider's own message verbatim when it parses
        if let Ok(error_response) = serde_json::from_str::<GroqErrorResponse>(body) {
            return QueryError::GenerationFailure(format!(
                "Groq API error: {}",
                error_response.error.message
            ));
        }

        QueryError::GenerationFailure(format!("Groq API error ({status}): {body}"))
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, QueryError> {
        let request = GroqRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            stream: false,
        };

        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(GROQ_API_URL)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryError::Timeout(self.config.timeout_secs)
                } else if e.is_connect() {
                    QueryError::GenerationFailure(
                        "Failed to connect to the Groq API. Check your network.".to_string(),
                    )
                } else {
                    QueryError::GenerationFailure(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            QueryError::GenerationFailure(format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let response: GroqResponse = serde_json::from_str(&body)
            .map_err(|e| QueryError::GenerationFailure(format!("Failed to parse response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| QueryError::GenerationFailure("Empty response from Groq".to_string()))
    }
}

// Groq wire types (OpenAI-compatible)

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Debug, Deserialize)]
struct GroqErrorResponse {
    error: GroqError,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    message: String,
}
