//! Chat session for Parley.
//!
//! Holds the visible transcript and implements the one-question-at-a-time
//! loop: forward the question through the agent handle, append the reply.
//! Errors are appended as assistant turns so every failure is visible in
//! the transcript.

use crate::agent::AgentHandle;
use crate::db::QueryResult;
use crate::error::QueryError;

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Human input.
    User,
    /// Agent reply (answer or error text).
    Assistant,
}

/// A single turn in the transcript.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Who produced this turn.
    pub role: ChatRole,
    /// The visible text.
    pub text: String,
    /// Tabular result, present when the underlying query produced rows.
    pub table: Option<QueryResult>,
}

impl ChatTurn {
    /// Creates a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            table: None,
        }
    }

    /// Creates an assistant turn with an optional table.
    pub fn assistant(text: impl Into<String>, table: Option<QueryResult>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            table,
        }
    }

    /// Returns the speaker label for display purposes.
    pub fn speaker_label(&self) -> &'static str {
        match self.role {
            ChatRole::User => "You",
            ChatRole::Assistant => "Parley",
        }
    }
}

/// An append-only chat transcript plus the ask/clear operations over it.
///
/// The session never owns the agent handle; it borrows one per ask. This
/// keeps handle replacement entirely inside the connection manager.
#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    /// Creates a new empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transcript, oldest turn first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Returns the number of turns in the transcript.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forwards a question through the agent handle and records both turns.
    ///
    /// Fails with `QueryError::NoConnection` when no handle exists. On any
    /// failure the error text is recorded as the assistant turn and the
    /// error is returned as well, so callers can distinguish outcomes
    /// without re-parsing the transcript.
    pub async fn ask(
        &mut self,
        handle: Option<&AgentHandle>,
        question: &str,
    ) -> Result<&ChatTurn, QueryError> {
        let result = match handle {
            Some(handle) => handle.ask(question, &self.turns).await,
            None => Err(QueryError::NoConnection),
        };

        self.turns.push(ChatTurn::user(question));

        match result {
            Ok(turn) => {
                self.turns.push(turn);
                Ok(self.turns.last().expect("turn was just appended"))
            }
            Err(e) => {
                self.turns.push(ChatTurn::assistant(format!("Error: {e}"), None));
                Err(e)
            }
        }
    }

    /// Discards all turns. The agent handle is not affected.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
