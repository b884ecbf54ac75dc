//! Connection lifecycle integration tests.
//!
//! These tests require a running MySQL database.
//! Set DATABASE_URL environment variable to run them.

use db_parley::config::ConnectionConfig;
use db_parley::connection::ConnectionManager;
use db_parley::db::{DatabaseClient, MySqlClient};
use db_parley::error::ConnectionError;
use db_parley::llm::MockLlmClient;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to build a config from the test database URL.
fn get_test_config() -> Option<ConnectionConfig> {
    let url = get_test_database_url()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

#[tokio::test]
async fn test_connect_with_valid_credentials() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let client = MySqlClient::connect(&config).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();

    // A seeded test database has at least one table
    assert!(!schema.tables.is_empty(), "Expected at least one table");

    client.close().await;
}

#[tokio::test]
async fn test_connect_with_bad_password_fails_auth() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.password = Some("definitely-the-wrong-password".to_string());

    let err = MySqlClient::connect(&config).await.unwrap_err();
    assert!(matches!(err, ConnectionError::AuthFailure(_)));
}

#[tokio::test]
async fn test_manager_connect_produces_usable_handle() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let mut manager = ConnectionManager::new();
    manager
        .connect(&config, Box::new(MockLlmClient::new()))
        .await
        .unwrap();

    assert!(manager.is_connected());
    let handle = manager.handle().unwrap();
    assert!(!handle.schema().tables.is_empty());

    manager.close().await;
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_manager_failed_connect_creates_no_handle() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.password = Some("definitely-the-wrong-password".to_string());

    let mut manager = ConnectionManager::new();
    let err = manager
        .connect(&config, Box::new(MockLlmClient::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::AuthFailure(_)));
    assert!(!manager.is_connected());
    assert!(manager.handle().is_none());
}

#[tokio::test]
async fn test_manager_reconnect_replaces_handle() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let mut manager = ConnectionManager::new();
    manager
        .connect(&config, Box::new(MockLlmClient::new()))
        .await
        .unwrap();

    // Reconnecting with the same settings installs a fresh handle
    manager
        .connect(&config, Box::new(MockLlmClient::new()))
        .await
        .unwrap();

    assert!(manager.is_connected());

    // A failed reconnect afterwards keeps the working handle
    let mut bad = config.clone();
    bad.password = Some("definitely-the-wrong-password".to_string());
    let result = manager.connect(&bad, Box::new(MockLlmClient::new())).await;

    assert!(result.is_err());
    assert!(manager.is_connected());

    manager.close().await;
}
