//! Mock database clients for testing.
//!
//! Provide in-memory implementations so session behavior can be exercised
//! without a running server.

use super::{ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Value};
use crate::error::QueryError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    schema: Schema,
    canned: Vec<(String, QueryResult)>,
    queries_run: AtomicUsize,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            canned: Vec::new(),
            queries_run: AtomicUsize::new(0),
        }
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            canned: Vec::new(),
            queries_run: AtomicUsize::new(0),
        }
    }

    /// Registers a canned result returned when the executed SQL contains
    /// `pattern` (case-insensitive).
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.canned.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Number of queries executed against this mock.
    pub fn queries_run(&self) -> usize {
        self.queries_run.load(Ordering::Relaxed)
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema, QueryError> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.queries_run.fetch_add(1, Ordering::Relaxed);

        let sql_lower = sql.to_lowercase();
        for (pattern, result) in &self.canned {
            if sql_lower.contains(pattern) {
                return Ok(result.clone());
            }
        }

        if sql_lower.trim_start().starts_with("select") {
            let columns = vec![ColumnInfo::new("result", "TEXT")];
            let rows: Vec<Row> = vec![vec![Value::String(format!("Mock result for: {sql}"))]];

            Ok(QueryResult::with_data(columns, rows)
                .with_execution_time(Duration::from_millis(1)))
        } else {
            Ok(QueryResult::new().with_execution_time(Duration::from_millis(1)))
        }
    }

    async fn close(&self) {}
}

/// A mock database client whose queries always fail.
///
/// Useful for exercising the execution-failure path in chat.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("ERROR 1146: Table 'shop.users' doesn't exist")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema, QueryError> {
        Ok(Schema::default())
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult, QueryError> {
        Err(QueryError::ExecutionFailure(self.message.clone()))
    }

    async fn close(&self) {}
}
