//! Database abstraction layer for Parley.
//!
//! Provides a trait-based interface for database operations so the agent
//! can run against a live MySQL connection or an in-memory mock.

mod mock;
mod mysql;
mod schema;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, QueryError};
use async_trait::async_trait;

/// Opens a database client for the given configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(
    config: &ConnectionConfig,
) -> Result<Box<dyn DatabaseClient>, ConnectionError> {
    let client = MySqlClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// All operations are async; errors carry the typed query-failure kinds so
/// they surface in chat without translation.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and relationship
    /// information.
    async fn introspect_schema(&self) -> Result<Schema, QueryError>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// Closes the database connection, releasing the underlying pool.
    async fn close(&self);
}
