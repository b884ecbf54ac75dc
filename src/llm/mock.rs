//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, so the full
//! ask pipeline can run without a network or an API key.

use async_trait::async_trait;

use crate::error::QueryError;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response), checked first.
    custom_responses: Vec<(String, String)>,
    /// When set, every completion fails with this message.
    failure: Option<String>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern`, the mock returns
    /// `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes every completion fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("age > 25") || input_lower.contains("older than 25") {
            return "```sql\nSELECT * FROM users WHERE age > 25;\n```".to_string();
        }

        if input_lower.contains("all users") || input_lower.contains("show users") {
            return "```sql\nSELECT * FROM users;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("users") {
            return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
        }

        if input_lower.contains("orders") && input_lower.contains("user") {
            return "```sql\nSELECT o.* FROM orders o\nJOIN users u ON o.user_id = u.id;\n```"
                .to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, QueryError> {
        if let Some(message) = &self.failure {
            return Err(QueryError::GenerationFailure(message.clone()));
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
