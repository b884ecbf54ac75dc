//! Query execution integration tests.
//!
//! These tests require a running MySQL database.
//! Set DATABASE_URL environment variable to run them. The seeded-data test
//! additionally expects a `users` table with an integer `age` column.

use db_parley::config::ConnectionConfig;
use db_parley::db::{DatabaseClient, MySqlClient, Value};
use db_parley::error::QueryError;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test client.
async fn get_test_client() -> Option<MySqlClient> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    MySqlClient::connect(&config).await.ok()
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 as num, 'hello' as greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.row_count, 1);
    assert!(!result.was_truncated);

    client.close().await;
}

#[tokio::test]
async fn test_execute_query_null_handling() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT NULL as nothing, 42 as answer")
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 1);
    assert!(result.rows[0][0].is_null());
    assert_eq!(result.rows[0][1], Value::Int(42));

    client.close().await;
}

#[tokio::test]
async fn test_execute_invalid_sql_is_execution_failure() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client
        .execute_query("SELEC * FORM users")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::ExecutionFailure(_)));

    client.close().await;
}

#[tokio::test]
async fn test_seeded_age_filter_rows_satisfy_predicate() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    // Verify the seed is present before relying on it
    let schema = client.introspect_schema().await.unwrap();
    let has_users_age = schema
        .tables
        .iter()
        .any(|t| t.name == "users" && t.columns.iter().any(|c| c.name == "age"));
    if !has_users_age {
        eprintln!("Skipping test: no seeded users(age) table");
        client.close().await;
        return;
    }

    let result = client
        .execute_query("SELECT age FROM users WHERE age > 25")
        .await
        .unwrap();

    for row in &result.rows {
        match row[0] {
            Value::Int(age) => assert!(age > 25, "row violates age > 25: {age}"),
            Value::Null => panic!("age should not be NULL in filtered rows"),
            ref other => panic!("expected integer age, got {other:?}"),
        }
    }

    client.close().await;
}
