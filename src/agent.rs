//! The database agent handle.
//!
//! An `AgentHandle` is the one live capability produced by a successful
//! connection: an open database session bound to an LLM client and the
//! introspected schema. It answers natural-language questions by generating
//! SQL, executing it, and composing a reply turn.

use std::time::Instant;

use tracing::{debug, info};

use crate::chat::ChatTurn;
use crate::db::{DatabaseClient, QueryResult, Schema};
use crate::error::QueryError;
use crate::llm::{build_messages, build_system_prompt, parse_reply, LlmClient};

/// A live database session bound to an LLM-backed agent.
///
/// The handle is owned by the connection manager and used read-only by the
/// chat loop; the system prompt is rendered once here because the schema is
/// fixed for the life of a connection.
pub struct AgentHandle {
    db: Box<dyn DatabaseClient>,
    llm: Box<dyn LlmClient>,
    schema: Schema,
    system_prompt: String,
}

impl AgentHandle {
    /// Binds a database client and an LLM client into an agent handle.
    pub fn new(db: Box<dyn DatabaseClient>, llm: Box<dyn LlmClient>, schema: Schema) -> Self {
        let system_prompt = build_system_prompt(&schema);
        Self {
            db,
            llm,
            schema,
            system_prompt,
        }
    }

    /// Returns the schema this handle was built against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Answers a natural-language question.
    ///
    /// Builds the message list from the schema prompt, the recent history,
    /// and the question; requests a completion; extracts SQL from the reply
    /// and executes it. Replies without SQL become text-only turns.
    pub async fn ask(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<ChatTurn, QueryError> {
        let start = Instant::now();
        debug!(question_len = question.len(), "Processing question");

        let messages = build_messages(&self.system_prompt, history, question);

        let llm_start = Instant::now();
        let reply = self.llm.complete(&messages).await?;
        debug!(
            llm_duration_ms = llm_start.elapsed().as_millis() as u64,
            reply_len = reply.len(),
            "Received LLM reply"
        );

        let parsed = parse_reply(&reply);

        let Some(sql) = parsed.sql else {
            info!(
                total_duration_ms = start.elapsed().as_millis() as u64,
                "Question answered without SQL"
            );
            return Ok(ChatTurn::assistant(parsed.text, None));
        };

        debug!(sql = %sql, "Executing generated SQL");
        let result = self.db.execute_query(&sql).await?;

        info!(
            total_duration_ms = start.elapsed().as_millis() as u64,
            row_count = result.row_count,
            "Question answered with query result"
        );

        let text = if parsed.text.is_empty() {
            summarize_result(&result)
        } else {
            parsed.text
        };

        let table = if result.rows.is_empty() {
            None
        } else {
            Some(result)
        };

        Ok(ChatTurn::assistant(text, table))
    }

    /// Closes the handle, releasing the underlying database connection.
    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Default answer line when the LLM supplied SQL without commentary.
fn summarize_result(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        "The query ran successfully but returned no rows.".to_string()
    } else {
        let noun = if result.row_count == 1 { "row" } else { "rows" };
        format!(
            "Found {} {noun} ({} ms).",
            result.row_count,
            result.execution_time.as_millis()
        )
    }
}
