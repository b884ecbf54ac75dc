//! Error types for Parley.
//!
//! Connection and query failures are separate enums because they surface in
//! different places: connection errors as form-style feedback, query errors
//! as chat turns.

use thiserror::Error;

/// Errors produced while establishing or testing a database connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The server rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The host could not be reached (refused, DNS failure, connect timeout).
    #[error("database unreachable: {0}")]
    NetworkUnreachable(String),

    /// The configuration itself is unusable (missing fields, unknown
    /// database, empty API key, malformed connection string).
    #[error("invalid connection settings: {0}")]
    InvalidConfig(String),
}

/// Errors produced while answering a question through the agent.
#[derive(Error, Debug)]
pub enum QueryError {
    /// No agent handle exists yet; connect first.
    #[error("not connected to a database")]
    NoConnection,

    /// The LLM call failed or its reply could not be turned into SQL.
    /// The underlying message is surfaced verbatim.
    #[error("could not generate SQL: {0}")]
    GenerationFailure(String),

    /// The database rejected the generated SQL. Surfaced verbatim.
    #[error("query failed: {0}")]
    ExecutionFailure(String),

    /// The remote call or the query exceeded its configured bound.
    #[error("timed out after {0} seconds")]
    Timeout(u64),
}

/// Top-level error type for Parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Connection lifecycle errors.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Chat/query errors.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration errors (invalid config file, missing required fields).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ParleyError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using ParleyError.
pub type Result<T, E = ParleyError> = std::result::Result<T, E>;
