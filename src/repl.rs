//! Interactive chat shell for Parley.
//!
//! A thin wiring layer: reads questions and slash-commands from stdin,
//! forwards them to the connection manager and chat session, and prints
//! replies and result tables as plain text.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::agent::AgentHandle;
use crate::chat::ChatSession;
use crate::config::{ConnectionConfig, LlmConfig};
use crate::connection::ConnectionManager;
use crate::db::{Column, ColumnInfo, MockDatabaseClient, QueryResult, Schema, Table, Value};
use crate::error::Result;
use crate::llm::{create_client, LlmProvider, MockLlmClient};

/// Maximum rendered width of a single table column.
const MAX_COL_WIDTH: usize = 40;

/// Help text displayed for the /help command.
const HELP_TEXT: &str = r#"Ask a question in plain English, or use a command:
  /connect         - Reconnect using the current connection settings
  /clear           - Clear the chat history (keeps the connection)
  /schema          - Display the database schema
  /help            - Show this help message
  /quit, /exit     - Exit"#;

/// What the dispatcher decided about the loop.
enum Flow {
    Continue,
    Quit,
}

/// The interactive shell state.
pub struct Shell {
    manager: ConnectionManager,
    session: ChatSession,
    connection: Option<ConnectionConfig>,
    provider: LlmProvider,
    llm_config: LlmConfig,
    mock: bool,
}

impl Shell {
    /// Creates a shell over an already-initialized manager and session.
    pub fn new(
        manager: ConnectionManager,
        session: ChatSession,
        connection: Option<ConnectionConfig>,
        provider: LlmProvider,
        llm_config: LlmConfig,
        mock: bool,
    ) -> Self {
        Self {
            manager,
            session,
            connection,
            provider,
            llm_config,
            mock,
        }
    }

    /// Runs the read-eval-print loop until /quit or end of input.
    pub async fn run(&mut self) -> Result<()> {
        println!("Parley - ask your database anything in plain English.");
        println!("Type /help for commands.");
        println!();

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print_prompt();
            let Ok(Some(line)) = lines.next_line().await else {
                break;
            };

            match self.dispatch(line.trim()).await {
                Flow::Continue => {}
                Flow::Quit => break,
            }
        }

        self.manager.close().await;
        Ok(())
    }

    /// Handles one line of input.
    async fn dispatch(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            return self.run_command(command).await;
        }

        self.handle_question(line).await;
        Flow::Continue
    }

    /// Dispatches a slash-command.
    async fn run_command(&mut self, command: &str) -> Flow {
        let name = command.split_whitespace().next().unwrap_or("");

        match name {
            "connect" => self.cmd_connect().await,
            "clear" => {
                self.session.clear();
                println!("Chat history cleared.");
            }
            "schema" => self.cmd_schema(),
            "help" => println!("{HELP_TEXT}"),
            "quit" | "exit" => return Flow::Quit,
            _ => println!("Unknown command: /{name}. Type /help for commands."),
        }

        Flow::Continue
    }

    /// Re-runs the connection test with the current settings, replacing the
    /// active handle on success.
    async fn cmd_connect(&mut self) {
        if self.mock {
            self.manager.install(demo_handle());
            self.session.clear();
            println!("Connection successful! (mock database)");
            return;
        }

        let Some(config) = self.connection.clone() else {
            println!("No connection settings available. Start parley with a connection string, flags, or a named connection.");
            return;
        };

        let llm = match create_client(self.provider, &self.llm_config) {
            Ok(client) => client,
            Err(e) => {
                println!("Connection failed: {e}");
                return;
            }
        };

        match self.manager.connect(&config, llm).await {
            Ok(()) => {
                // A new handle means prior answers no longer describe the
                // live database; drop them from context and view alike.
                self.session.clear();
                let table_count = self
                    .manager
                    .handle()
                    .map(|h| h.schema().tables.len())
                    .unwrap_or(0);
                println!(
                    "Connection successful! {} ({table_count} tables)",
                    config.display_string()
                );
            }
            Err(e) => println!("Connection failed: {e}"),
        }
    }

    /// Prints the schema of the connected database.
    fn cmd_schema(&self) {
        match self.manager.handle() {
            Some(handle) => println!("{}", handle.schema().format_for_display()),
            None => println!("Not connected. Use /connect first."),
        }
    }

    /// Forwards a question through the session and prints the reply.
    async fn handle_question(&mut self, question: &str) {
        debug!(question, "Dispatching question");

        // Success or failure, the reply is the latest assistant turn:
        // errors are recorded in the transcript too.
        let _ = self.session.ask(self.manager.handle(), question).await;

        if let Some(turn) = self.session.history().last() {
            print_turn(turn.speaker_label(), &turn.text, turn.table.as_ref());
        }
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("parley> ");
    let _ = std::io::stdout().flush();
}

/// Prints a chat turn with its optional result table.
fn print_turn(speaker: &str, text: &str, table: Option<&QueryResult>) {
    println!("{speaker}: {text}");
    if let Some(result) = table {
        println!();
        println!("{}", format_table(result));
    }
    println!();
}

/// Renders a query result as a plain-text table.
pub fn format_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("({} rows)", result.row_count);
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.chars().count()).collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(value.to_display_string().chars().count());
            }
        }
    }
    for width in &mut widths {
        *width = (*width).min(MAX_COL_WIDTH);
    }

    let mut out = String::new();

    // Header
    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad_cell(&col.name, *w))
        .collect();
    out.push_str(&header.join(" | "));
    out.push('\n');

    // Separator
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');

    // Rows
    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, w)| pad_cell(&value.to_display_string(), *w))
            .collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }

    // Footer
    let noun = if result.row_count == 1 { "row" } else { "rows" };
    out.push_str(&format!(
        "({} {noun}, {} ms)",
        result.row_count,
        result.execution_time.as_millis()
    ));
    if let Some(warning) = result.truncation_warning() {
        out.push('\n');
        out.push_str(&warning);
    }

    out
}

/// Pads or truncates a cell to the given width.
fn pad_cell(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let truncated: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{truncated}...")
    } else {
        let padding = " ".repeat(width - count);
        format!("{text}{padding}")
    }
}

/// Builds an agent handle over the in-memory mocks with a small demo schema.
///
/// Used by `--mock` so the whole flow can be exercised with no servers.
pub fn demo_handle() -> AgentHandle {
    let schema = Schema {
        tables: vec![
            Table {
                name: "users".to_string(),
                columns: vec![
                    Column::new("id", "int").nullable(false),
                    Column::new("name", "varchar(100)").nullable(false),
                    Column::new("age", "int"),
                ],
                primary_key: vec!["id".to_string()],
            },
            Table {
                name: "orders".to_string(),
                columns: vec![
                    Column::new("id", "int").nullable(false),
                    Column::new("user_id", "int").nullable(false),
                    Column::new("total", "decimal(10,2)").nullable(false),
                ],
                primary_key: vec!["id".to_string()],
            },
        ],
        foreign_keys: vec![crate::db::ForeignKey::new(
            "orders",
            vec!["user_id".to_string()],
            "users",
            vec!["id".to_string()],
        )],
    };

    let users = QueryResult::with_data(
        vec![
            ColumnInfo::new("id", "INT"),
            ColumnInfo::new("name", "VARCHAR"),
            ColumnInfo::new("age", "INT"),
        ],
        vec![
            vec![Value::Int(1), Value::from("Alice"), Value::Int(34)],
            vec![Value::Int(2), Value::from("Bob"), Value::Int(28)],
            vec![Value::Int(3), Value::from("Carol"), Value::Int(22)],
        ],
    );

    let adults = QueryResult::with_data(
        vec![
            ColumnInfo::new("id", "INT"),
            ColumnInfo::new("name", "VARCHAR"),
            ColumnInfo::new("age", "INT"),
        ],
        vec![
            vec![Value::Int(1), Value::from("Alice"), Value::Int(34)],
            vec![Value::Int(2), Value::from("Bob"), Value::Int(28)],
        ],
    );

    let db = MockDatabaseClient::with_schema(schema.clone())
        .with_result("age > 25", adults)
        .with_result("from users", users);

    AgentHandle::new(Box::new(db), Box::new(MockLlmClient::new()), schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn sample_result() -> QueryResult {
        QueryResult::with_data(
            vec![
                ColumnInfo::new("id", "INT"),
                ColumnInfo::new("name", "VARCHAR"),
            ],
            vec![
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2), Value::from("Bob")],
            ],
        )
        .with_execution_time(Duration::from_millis(12))
    }

    #[test]
    fn test_format_table_layout() {
        let formatted = format_table(&sample_result());
        let lines: Vec<&str> = formatted.lines().collect();

        assert_eq!(lines[0], "id | name ");
        assert_eq!(lines[1], "---+------");
        assert_eq!(lines[2], "1  | Alice");
        assert_eq!(lines[3], "2  | Bob  ");
        assert_eq!(lines[4], "(2 rows, 12 ms)");
    }

    #[test]
    fn test_format_table_truncates_wide_cells() {
        let long = "x".repeat(100);
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("note", "TEXT")],
            vec![vec![Value::String(long)]],
        );

        let formatted = format_table(&result);
        let data_line = formatted.lines().nth(2).unwrap();

        assert_eq!(data_line.chars().count(), MAX_COL_WIDTH);
        assert!(data_line.ends_with("..."));
    }

    #[test]
    fn test_format_table_without_columns() {
        let formatted = format_table(&QueryResult::new());
        assert_eq!(formatted, "(0 rows)");
    }

    #[test]
    fn test_format_table_includes_truncation_warning() {
        let mut result = sample_result();
        result.was_truncated = true;
        result.total_rows = Some(5000);

        let formatted = format_table(&result);
        assert!(formatted.contains("Result truncated"));
    }

    #[tokio::test]
    async fn test_demo_handle_answers_seeded_question() {
        let handle = demo_handle();

        let turn = handle
            .ask("Show me all users with age > 25", &[])
            .await
            .unwrap();

        let table = turn.table.expect("expected a tabular result");
        assert_eq!(table.row_count, 2);
        // Every returned row satisfies the filter
        for row in &table.rows {
            match row[2] {
                Value::Int(age) => assert!(age > 25),
                _ => panic!("expected integer age"),
            }
        }
    }
}
