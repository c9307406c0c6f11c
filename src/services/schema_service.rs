use serde_json::Value;
use std::sync::Arc;

use crate::error::{truncate, AppError, EXCERPT_MAX_LEN};
use crate::models::{
    split_qualified_name, ColumnInfo, QueryResult, RelationInfo, SchemaContext, SqlStatement,
    TableInfo, DEFAULT_SCHEMA,
};
use crate::services::database::DatabaseAdapter;
use crate::validation::{IdentifierGuard, IdentifierKind};

/// Upper bound for `preview_table`
pub const MAX_PREVIEW_ROWS: u32 = 1000;

const LIST_TABLES_SQL: &str = r#"
    SELECT table_schema, table_name
    FROM information_schema.tables
    WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
      AND table_type = 'BASE TABLE'
    ORDER BY table_schema, table_name
"#;

const LIST_SCHEMAS_SQL: &str = r#"
    SELECT schema_name
    FROM information_schema.schemata
    WHERE schema_name NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
    ORDER BY schema_name
"#;

/// Builds schema context for translation prompts by introspecting the
/// connected database through the database adapter.
pub struct SchemaService {
    db: Arc<dyn DatabaseAdapter>,
}

impl SchemaService {
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self { db }
    }

    /// Base tables outside the system schemas, as `schema.table`
    /// (bare `table` for the default schema)
    pub async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let result = self.run(LIST_TABLES_SQL).await?;
        Ok(result
            .rows()
            .iter()
            .map(|row| {
                let schema = cell_text(row.first());
                let table = cell_text(row.get(1));
                if schema == DEFAULT_SCHEMA {
                    table
                } else {
                    format!("{}.{}", schema, table)
                }
            })
            .collect())
    }

    pub async fn list_schemas(&self) -> Result<Vec<String>, AppError> {
        let result = self.run(LIST_SCHEMAS_SQL).await?;
        Ok(result
            .rows()
            .iter()
            .map(|row| cell_text(row.first()))
            .collect())
    }

    /// Describe the given tables, or every table when `table_names` is None.
    ///
    /// A table that cannot be described (invalid name, failed introspection
    /// query) is logged and skipped, so the context may be partial.
    pub async fn discover_schema(
        &self,
        table_names: Option<&[String]>,
    ) -> Result<SchemaContext, AppError> {
        if !self.db.is_connected().await {
            return Err(AppError::NotConnected);
        }

        let names = match table_names {
            Some(names) => names.to_vec(),
            None => self.list_tables().await?,
        };

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            match self.discover_table(name).await {
                Ok(table) => tables.push(table),
                Err(e) => {
                    tracing::warn!(
                        table = %truncate(name, EXCERPT_MAX_LEN),
                        error = %e,
                        "Skipping table during schema discovery"
                    );
                }
            }
        }

        tracing::debug!(
            requested = names.len(),
            discovered = tables.len(),
            "Schema discovery finished"
        );
        Ok(SchemaContext::new(tables))
    }

    /// First `limit` rows of a table, limit clamped to [1, MAX_PREVIEW_ROWS]
    pub async fn preview_table(&self, name: &str, limit: u32) -> Result<QueryResult, AppError> {
        let (schema, table) = split_qualified_name(name);
        let schema = IdentifierGuard::validated(schema, IdentifierKind::Schema)?;
        let table = IdentifierGuard::validated(table, IdentifierKind::Table)?;
        let limit = limit.clamp(1, MAX_PREVIEW_ROWS);

        self.run(&format!("SELECT * FROM {}.{} LIMIT {}", schema, table, limit))
            .await
    }

    async fn discover_table(&self, name: &str) -> Result<TableInfo, AppError> {
        let (schema, table) = split_qualified_name(name);
        IdentifierGuard::validate(schema, IdentifierKind::Schema)?;
        IdentifierGuard::validate(table, IdentifierKind::Table)?;

        let columns = self.discover_columns(schema, table).await?;
        let relations = self.discover_relations(schema, table).await?;

        Ok(TableInfo {
            schema_name: schema.to_string(),
            table_name: table.to_string(),
            columns,
            relations,
        })
    }

    async fn discover_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, AppError> {
        // information_schema compares names as values, so they go in as string literals
        let schema_literal = IdentifierGuard::escape_string_literal(schema);
        let table_literal = IdentifierGuard::escape_string_literal(table);
        let sql = format!(
            r#"
            SELECT
                c.column_name,
                c.data_type,
                c.is_nullable,
                CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key
            FROM information_schema.columns c
            LEFT JOIN (
                SELECT kcu.column_name
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                    ON tc.constraint_name = kcu.constraint_name
                    AND tc.table_schema = kcu.table_schema
                WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = {schema}
                    AND tc.table_name = {table}
            ) pk ON c.column_name = pk.column_name
            WHERE c.table_schema = {schema}
                AND c.table_name = {table}
            ORDER BY c.ordinal_position
            "#,
            schema = schema_literal,
            table = table_literal,
        );

        let result = self.run(&sql).await?;
        Ok(result
            .rows()
            .iter()
            .map(|row| ColumnInfo {
                name: cell_text(row.first()),
                data_type: cell_text(row.get(1)),
                nullable: cell_text(row.get(2)).eq_ignore_ascii_case("YES"),
                primary_key: cell_bool(row.get(3)),
            })
            .collect())
    }

    async fn discover_relations(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RelationInfo>, AppError> {
        let sql = format!(
            r#"
            SELECT
                kcu.column_name,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
                AND tc.table_schema = {schema}
                AND tc.table_name = {table}
            ORDER BY kcu.ordinal_position
            "#,
            schema = IdentifierGuard::escape_string_literal(schema),
            table = IdentifierGuard::escape_string_literal(table),
        );

        let result = self.run(&sql).await?;
        Ok(result
            .rows()
            .iter()
            .map(|row| RelationInfo {
                column_name: cell_text(row.first()),
                referenced_table: cell_text(row.get(1)),
                referenced_column: cell_text(row.get(2)),
            })
            .collect())
    }

    async fn run(&self, sql: &str) -> Result<QueryResult, AppError> {
        let statement = SqlStatement::new(sql)?;
        self.db.execute(&statement).await
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "t" | "yes"),
        _ => false,
    }
}
