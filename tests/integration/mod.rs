//! Integration tests for Parley.
//!
//! Live-database tests are gated on the DATABASE_URL environment variable.

pub mod connection_test;
pub mod query_test;
pub mod session_test;
