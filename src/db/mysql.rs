//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient`
//! trait for MySQL/MariaDB databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
};
use crate::error::{ConnectionError, QueryError};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 1000;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Opens a connection pool with the given configuration.
    ///
    /// Connection failures are not retried; a bad address or credential
    /// surfaces immediately as the matching `ConnectionError` kind.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let conn_str = config
            .to_connection_string()
            .map_err(|e| ConnectionError::InvalidConfig(e.to_string()))?;

        debug!(database = %config.display_string(), "Opening connection pool");

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self { pool })
    }

    /// Creates a new MySqlClient from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn introspect_schema(&self) -> Result<Schema, QueryError> {
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys().await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, QueryError> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| QueryError::Timeout(QUERY_TIMEOUT_SECS))?
        .map_err(|e| QueryError::ExecutionFailure(format_query_error(e)))?;

        let execution_time = start.elapsed();

        // Column metadata comes from the first row; a result with no rows
        // carries no metadata worth rendering.
        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;

        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        debug!(
            duration_ms = execution_time.as_millis() as u64,
            row_count, "Query executed"
        );

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

impl MySqlClient {
    /// Fetches all base tables in the connected database.
    async fn fetch_tables(&self) -> Result<Vec<Table>, QueryError> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QueryError::ExecutionFailure(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let columns = self.fetch_columns(&table_name).await?;
            let primary_key = self.fetch_primary_key(&table_name).await?;

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
            });
        }

        Ok(tables)
    }

    /// Fetches columns for a specific table.
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>, QueryError> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT column_name, column_type, is_nullable, column_default
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            QueryError::ExecutionFailure(format!("Failed to fetch columns for {table_name}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default)| Column {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                default,
            })
            .collect())
    }

    /// Fetches primary key columns for a specific table.
    async fn fetch_primary_key(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
        let columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND table_name = ?
                AND constraint_name = 'PRIMARY'
            ORDER BY ordinal_position
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            QueryError::ExecutionFailure(format!(
                "Failed to fetch primary key for {table_name}: {e}"
            ))
        })?;

        Ok(columns)
    }

    /// Fetches all foreign key relationships in the connected database.
    ///
    /// MySQL exposes these directly in `key_column_usage`; rows are grouped
    /// by constraint so multi-column keys stay together.
    async fn fetch_foreign_keys(&self) -> Result<Vec<ForeignKey>, QueryError> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT constraint_name, table_name, column_name,
                   referenced_table_name, referenced_column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND referenced_table_name IS NOT NULL
            ORDER BY table_name, constraint_name, ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QueryError::ExecutionFailure(format!("Failed to fetch foreign keys: {e}")))?;

        let mut fk_map: BTreeMap<(String, String), (String, Vec<String>, Vec<String>)> =
            BTreeMap::new();

        for (constraint, from_table, from_column, to_table, to_column) in rows {
            let entry = fk_map
                .entry((from_table, constraint))
                .or_insert_with(|| (to_table, Vec::new(), Vec::new()));
            entry.1.push(from_column);
            entry.2.push(to_column);
        }

        Ok(fk_map
            .into_iter()
            .map(
                |((from_table, _), (to_table, from_columns, to_columns))| ForeignKey {
                    from_table,
                    from_columns,
                    to_table,
                    to_columns,
                },
            )
            .collect())
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" => decode_int::<i8>(row, index),
        "SMALLINT" => decode_int::<i16>(row, index),
        "MEDIUMINT" | "INT" => decode_int::<i32>(row, index),
        "BIGINT" => decode_int::<i64>(row, index),

        "TINYINT UNSIGNED" => decode_uint::<u8>(row, index),
        "SMALLINT UNSIGNED" => decode_uint::<u16>(row, index),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => decode_uint::<u32>(row, index),
        "BIGINT UNSIGNED" => decode_uint::<u64>(row, index),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DECIMAL" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "DATE" => decode_display::<chrono::NaiveDate>(row, index),
        "TIME" => decode_display::<chrono::NaiveTime>(row, index),
        "DATETIME" => decode_display::<chrono::NaiveDateTime>(row, index),
        "TIMESTAMP" => decode_display::<chrono::DateTime<chrono::Utc>>(row, index),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn decode_int<'r, T>(row: &'r MySqlRow, index: usize) -> Value
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Into<i64>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|v| Value::Int(v.into()))
        .unwrap_or(Value::Null)
}

fn decode_uint<'r, T>(row: &'r MySqlRow, index: usize) -> Value
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Into<u64>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|v| Value::from(v.into()))
        .unwrap_or(Value::Null)
}

fn decode_display<'r, T>(row: &'r MySqlRow, index: usize) -> Value
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + std::fmt::Display,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

/// Maps sqlx connection errors to the typed connection-failure kinds.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ConnectionError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("access denied") || error_str.contains("authentication") {
        ConnectionError::AuthFailure(format!(
            "Access denied for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        ConnectionError::InvalidConfig(format!("Database '{database}' does not exist."))
    } else if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ConnectionError::NetworkUnreachable(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ConnectionError::NetworkUnreachable(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else if error_str.contains("failed to lookup") || error_str.contains("dns") {
        ConnectionError::NetworkUnreachable(format!("Cannot resolve host '{host}'."))
    } else {
        ConnectionError::NetworkUnreachable(error.to_string())
    }
}

/// Formats a query error with the server error code when available.
fn format_query_error(error: sqlx::Error) -> String {
    if let Some(db_error) = error.as_database_error() {
        if let Some(mysql_error) = db_error.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
            return format!(
                "ERROR {}: {}",
                mysql_error.number(),
                mysql_error.message()
            );
        }
        return format!("ERROR: {}", db_error.message());
    }
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running MySQL database.
    // They are skipped unless DATABASE_URL is set.

    fn get_test_database_url() -> Option<String> {
        std::env::var("DATABASE_URL").ok()
    }

    async fn get_test_client() -> Option<MySqlClient> {
        let url = get_test_database_url()?;
        let config = ConnectionConfig::from_connection_string(&url).ok()?;
        MySqlClient::connect(&config).await.ok()
    }

    #[tokio::test]
    async fn test_connect_to_database() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        // If we got here, connection succeeded
        client.close().await;
    }

    #[tokio::test]
    async fn test_execute_select_query() {
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

        client.close().await;
    }

    #[tokio::test]
    async fn test_execute_query_with_error() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = client
            .execute_query("SELECT * FROM nonexistent_table_xyz")
            .await;

        let error = result.unwrap_err();
        assert!(matches!(error, QueryError::ExecutionFailure(_)));
        assert!(
            error.to_string().contains("nonexistent_table_xyz")
                || error.to_string().contains("doesn't exist")
        );

        client.close().await;
    }

    #[tokio::test]
    async fn test_connection_error_is_typed() {
        let config = ConnectionConfig {
            host: Some("nonexistent.invalid.host".to_string()),
            port: 3306,
            database: Some("testdb".to_string()),
            user: Some("testuser".to_string()),
            password: Some("testpass".to_string()),
        };

        let result = MySqlClient::connect(&config).await;
        let error = result.unwrap_err();
        assert!(matches!(error, ConnectionError::NetworkUnreachable(_)));
    }
}
