//! Database schema types for Parley.
//!
//! Represents the structure of a database: tables, columns, and foreign
//! keys. The schema is introspected once per connection and injected into
//! the LLM system prompt.

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    ///
    /// Produces a human-readable representation that helps the LLM
    /// understand the database structure.
    pub fn format_for_llm(&self) -> String {
        let mut out = String::from("Database Schema:\n\n");

        for table in &self.tables {
            out.push_str(&format!("Table: {}\n", table.name));
            for column in &table.columns {
                out.push_str(&self.format_column(table, column));
            }
            out.push('\n');
        }

        if !self.foreign_keys.is_empty() {
            out.push_str("Foreign Keys:\n");
            for fk in &self.foreign_keys {
                out.push_str(&format!(
                    "  - {}.{} -> {}.{}\n",
                    fk.from_table,
                    fk.from_columns.join(", "),
                    fk.to_table,
                    fk.to_columns.join(", ")
                ));
            }
        }

        out
    }

    fn format_column(&self, table: &Table, column: &Column) -> String {
        let mut annotations: Vec<String> = Vec::new();

        if table.primary_key.contains(&column.name) {
            annotations.push("PK".to_string());
        }
        if !column.is_nullable {
            annotations.push("NOT NULL".to_string());
        }
        for fk in &self.foreign_keys {
            if fk.from_table == table.name && fk.from_columns.contains(&column.name) {
                annotations.push(format!(
                    "FK -> {}.{}",
                    fk.to_table,
                    fk.to_columns.first().map(String::as_str).unwrap_or("")
                ));
            }
        }
        if let Some(default) = &column.default {
            annotations.push(format!("DEFAULT {default}"));
        }

        if annotations.is_empty() {
            format!("  - {}: {}\n", column.name, column.data_type)
        } else {
            format!(
                "  - {}: {} ({})\n",
                column.name,
                column.data_type,
                annotations.join(", ")
            )
        }
    }

    /// Formats the schema for display in the shell.
    pub fn format_for_display(&self) -> String {
        self.format_for_llm()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type as reported by the server (e.g., "int", "varchar(255)").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default)]
pub struct ForeignKey {
    /// Source table name.
    pub from_table: String,

    /// Source column names.
    pub from_columns: Vec<String>,

    /// Target table name.
    pub to_table: String,

    /// Target column names.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}
