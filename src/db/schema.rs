//! Database schema types for SQLFlow.
//!
//! Represents the structure of a database (tables, columns and foreign keys)
//! and renders it as the text handed to the LLM.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a schema in canonical order: tables by name, foreign keys by source.
    ///
    /// Column order is left untouched; catalogs return it by ordinal position.
    pub fn new(mut tables: Vec<Table>, mut foreign_keys: Vec<ForeignKey>) -> Self {
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        foreign_keys.sort();
        Self {
            tables,
            foreign_keys,
        }
    }

    /// Returns the table names in order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Formats the schema for inclusion in an LLM prompt.
    pub fn format_for_llm(&self) -> String {
        if self.tables.is_empty() {
            return "Database Schema:\n\n(no tables)\n".to_string();
        }

        let tables_text = self
            .tables
            .iter()
            .map(|table| self.format_table_for_llm(table))
            .collect::<Vec<_>>()
            .join("");

        let foreign_keys_text = if self.foreign_keys.is_empty() {
            String::new()
        } else {
            let fk_lines = self
                .foreign_keys
                .iter()
                .map(|fk| {
                    format!(
                        "  - {}.{} -> {}.{}\n",
                        fk.from_table,
                        fk.from_columns.join(", "),
                        fk.to_table,
                        fk.to_columns.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("");
            format!("Foreign Keys:\n{}", fk_lines)
        };

        format!("Database Schema:\n\n{}{}", tables_text, foreign_keys_text)
    }

    fn format_table_for_llm(&self, table: &Table) -> String {
        let column_lines = table
            .columns
            .iter()
            .map(|column| Self::format_column_line(table, column))
            .collect::<Vec<_>>()
            .join("");

        format!("Table: {}\n{}\n", table.name, column_lines)
    }

    fn format_column_line(table: &Table, column: &Column) -> String {
        let annotations = [
            table.primary_key.contains(&column.name).then_some("PK"),
            (!column.is_nullable).then_some("NOT NULL"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

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
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in ordinal order.
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

    /// Adds a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    pub fn primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "int", "varchar(255)").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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

/// Groups catalog rows `(table, column, type, nullable, is_pk)` into tables.
///
/// Rows for one table must be contiguous and in ordinal order.
pub(crate) fn tables_from_catalog(
    rows: impl IntoIterator<Item = (String, String, String, bool, bool)>,
) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::new();
    for (table_name, column_name, data_type, nullable, is_pk) in rows {
        if tables.last().map(|t| t.name != table_name).unwrap_or(true) {
            tables.push(Table::new(table_name));
        }
        if let Some(table) = tables.last_mut() {
            if is_pk {
                table.primary_key.push(column_name.clone());
            }
            table
                .columns
                .push(Column::new(column_name, data_type).nullable(nullable));
        }
    }
    tables
}

/// Groups catalog rows `(from_table, constraint, from_column, to_table, to_column)`
/// into foreign keys.
///
/// Rows for one constraint must be contiguous and in key order.
pub(crate) fn foreign_keys_from_catalog(
    rows: impl IntoIterator<Item = (String, String, String, String, String)>,
) -> Vec<ForeignKey> {
    let mut keys: Vec<(String, ForeignKey)> = Vec::new();
    for (from_table, constraint, from_column, to_table, to_column) in rows {
        let starts_new = keys
            .last()
            .map(|(name, fk)| *name != constraint || fk.from_table != from_table)
            .unwrap_or(true);
        if starts_new {
            keys.push((
                constraint,
                ForeignKey::new(from_table, Vec::new(), to_table, Vec::new()),
            ));
        }
        if let Some((_, fk)) = keys.last_mut() {
            fk.from_columns.push(from_column);
            fk.to_columns.push(to_column);
        }
    }
    keys.into_iter().map(|(_, fk)| fk).collect()
}
