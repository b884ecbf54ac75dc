//! Connection manager for the agent-handle lifecycle.
//!
//! The manager is the only code that creates, replaces, or closes the agent
//! handle. The chat loop only ever borrows it, so there is exactly zero or
//! one live handle at any time.

use tracing::info;

use crate::agent::AgentHandle;
use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::llm::LlmClient;

/// Owns the current agent handle and performs connection tests.
#[derive(Default)]
pub struct ConnectionManager {
    active: Option<AgentHandle>,
}

impl ConnectionManager {
    /// Creates a new connection manager with no active handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tests the given credentials by opening a live session, and installs
    /// the resulting agent handle on success.
    ///
    /// The new connection is fully established (pool opened, schema
    /// introspected) before the previous handle is closed and replaced, so
    /// a failed attempt leaves the existing handle untouched.
    pub async fn connect(
        &mut self,
        config: &ConnectionConfig,
        llm: Box<dyn LlmClient>,
    ) -> Result<(), ConnectionError> {
        config.validate()?;

        let db = crate::db::connect(config).await?;
        let schema = db.introspect_schema().await.map_err(|e| {
            ConnectionError::InvalidConfig(format!("Could not read database schema: {e}"))
        })?;

        info!(
            database = %config.display_string(),
            table_count = schema.tables.len(),
            "Connection established"
        );

        if let Some(old) = self.active.take() {
            old.close().await;
        }

        self.active = Some(AgentHandle::new(db, llm, schema));

        Ok(())
    }

    /// Installs an already-built handle.
    ///
    /// Used by tests and mock mode to bypass a live connection attempt.
    pub fn install(&mut self, handle: AgentHandle) {
        self.active = Some(handle);
    }

    /// Returns the active agent handle, if any.
    pub fn handle(&self) -> Option<&AgentHandle> {
        self.active.as_ref()
    }

    /// Returns true if there is an active handle.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Closes and drops the active handle.
    pub async fn close(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.close().await;
        }
    }
}
