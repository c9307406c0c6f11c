use serde::{Deserialize, Serialize};

/// Schema that unqualified table names resolve to
pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Foreign key from `column_name` to `referenced_table.referenced_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub relations: Vec<RelationInfo>,
}

impl TableInfo {
    /// `schema.table`, or just `table` for the default schema
    pub fn full_name(&self) -> String {
        if self.schema_name.trim().is_empty() || self.schema_name == DEFAULT_SCHEMA {
            self.table_name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.table_name)
        }
    }
}

/// Split `schema.table` into its parts, defaulting the schema
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => (DEFAULT_SCHEMA, name),
    }
}

/// Tables, columns and relations used to ground translation prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContext {
    tables: Vec<TableInfo>,
}

impl SchemaContext {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self { tables }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Deterministic textual description for the model prompt
    pub fn to_prompt_string(&self) -> String {
        if self.tables.is_empty() {
            return "No schema information available.".to_string();
        }

        let mut context = String::from("Database Schema:\n\n");
        for table in &self.tables {
            context.push_str(&format!("Table: {}\n", table.full_name()));
            context.push_str("Columns:\n");
            for column in &table.columns {
                context.push_str(&format!("  - {} ({})", column.name, column.data_type));
                if column.primary_key {
                    context.push_str(" PRIMARY KEY");
                }
                if !column.nullable {
                    context.push_str(" NOT NULL");
                }
                context.push('\n');
            }
            if !table.relations.is_empty() {
                context.push_str("Relations:\n");
                for relation in &table.relations {
                    context.push_str(&format!(
                        "  - {} -> {}.{}\n",
                        relation.column_name, relation.referenced_table, relation.referenced_column
                    ));
                }
            }
            context.push('\n');
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_table() -> TableInfo {
        TableInfo {
            schema_name: "public".to_string(),
            table_name: "orders".to_string(),
            columns: vec![
                ColumnInfo {
                    name: "id".to_string(),
                    data_type: "bigint".to_string(),
                    nullable: false,
                    primary_key: true,
                },
                ColumnInfo {
                    name: "user_id".to_string(),
                    data_type: "bigint".to_string(),
                    nullable: true,
                    primary_key: false,
                },
                ColumnInfo {
                    name: "total".to_string(),
                    data_type: "decimal".to_string(),
                    nullable: true,
                    primary_key: false,
                },
            ],
            relations: vec![RelationInfo {
                column_name: "user_id".to_string(),
                referenced_table: "users".to_string(),
                referenced_column: "id".to_string(),
            }],
        }
    }

    #[test]
    fn test_prompt_string_describes_table() {
        let prompt = SchemaContext::new(vec![orders_table()]).to_prompt_string();

        assert!(prompt.starts_with("Database Schema:"));
        assert!(prompt.contains("Table: orders"));
        assert!(prompt.contains("id (bigint) PRIMARY KEY NOT NULL"));
        assert!(prompt.contains("  - total (decimal)\n"));
        assert!(prompt.contains("user_id -> users.id"));
    }

    #[test]
    fn test_prompt_string_is_deterministic() {
        let context = SchemaContext::new(vec![orders_table()]);
        assert_eq!(context.to_prompt_string(), context.clone().to_prompt_string());
    }

    #[test]
    fn test_empty_context_prompt() {
        assert_eq!(
            SchemaContext::empty().to_prompt_string(),
            "No schema information available."
        );
    }

    #[test]
    fn test_full_name_omits_default_schema() {
        let mut table = orders_table();
        assert_eq!(table.full_name(), "orders");

        table.schema_name = "sales".to_string();
        assert_eq!(table.full_name(), "sales.orders");

        table.schema_name = String::new();
        assert_eq!(table.full_name(), "orders");
    }

    #[test]
    fn test_split_qualified_name() {
        assert_eq!(split_qualified_name("orders"), ("public", "orders"));
        assert_eq!(split_qualified_name("sales.orders"), ("sales", "orders"));
        assert_eq!(split_qualified_name("a.b.c"), ("a", "b.c"));
    }
}
