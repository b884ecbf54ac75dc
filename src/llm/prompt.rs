//! Prompt construction for LLM requests.
//!
//! Builds system prompts with database schema context and converts chat
//! history into a bounded message list.

use crate::chat::{ChatRole, ChatTurn};
use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for the SQL assistant.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL assistant for a MySQL database. Generate SQL queries based on user questions.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid MySQL SQL
- Use appropriate JOINs based on foreign keys
- Limit results to 100 rows unless the user specifies otherwise
- Never generate DROP DATABASE or similar destructive operations
- If the question cannot be answered with the schema, explain why

OUTPUT FORMAT:
Return the SQL query wrapped in ```sql code blocks.
If you need to explain something, put it before or after the code block."#;

/// Maximum number of prior exchanges (user + assistant turn pairs) included
/// as context. Older turns are dropped from the request, not from the
/// visible transcript.
const MAX_CONTEXT_EXCHANGES: usize = 10;

/// Builds the system prompt with the database schema injected.
pub fn build_system_prompt(schema: &Schema) -> String {
    let schema_text = schema.format_for_llm();
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema_text)
}

/// Builds the complete message list for a completion request.
///
/// Combines the pre-rendered system prompt with the most recent chat
/// history and the new question.
pub fn build_messages(system_prompt: &str, history: &[ChatTurn], question: &str) -> Vec<Message> {
    let context = recent_context(history);

    let mut messages = Vec::with_capacity(context.len() + 2);
    messages.push(Message::system(system_prompt));

    for turn in context {
        let message = match turn.role {
            ChatRole::User => Message::user(turn.text.as_str()),
            ChatRole::Assistant => Message::assistant(turn.text.as_str()),
        };
        messages.push(message);
    }

    messages.push(Message::user(question));
    messages
}

/// Returns the most recent turns, bounded to `MAX_CONTEXT_EXCHANGES` pairs.
fn recent_context(history: &[ChatTurn]) -> &[ChatTurn] {
    let max_turns = MAX_CONTEXT_EXCHANGES * 2;
    let start = history.len().saturating_sub(max_turns);
    &history[start..]
}
