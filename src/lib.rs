//! Parley - chat with your MySQL database in plain English.
//!
//! Natural-language questions are translated to SQL by a remote LLM,
//! executed against a live connection, and answered with text plus a
//! result table.

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod llm;
pub mod repl;
