//! Schema management for table definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::schema::column::SourceColumn;
use crate::schema::table::TableDefinition;

/// A schema: an ordered set of table definitions.
///
/// # Examples
///
/// ```
/// use glaive::analysis::tokenizer::TokenizerKind;
/// use glaive::schema::{IndexDefinition, Schema, TableDefinition};
///
/// let schema = Schema::builder()
///     .create_table(TableDefinition::new("Articles").text("content"))
///     .create_table(
///         TableDefinition::new("Terms")
///             .default_tokenizer(TokenizerKind::BigramSplitSymbolAlpha)
///             .index(IndexDefinition::new("Articles.content")),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.len(), 2);
/// assert!(schema.get_table("Terms").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: Vec<TableDefinition>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Schema { tables: Vec::new() }
    }

    /// Create a builder for constructing schemas.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Parse and validate a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Get a table definition by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// All table definitions in declaration order.
    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Combine this schema with more tables, validating the result.
    pub fn merge(&self, other: &Schema) -> Result<Schema> {
        let mut tables = self.tables.clone();
        tables.extend(other.tables.iter().cloned());
        let merged = Schema { tables };
        merged.validate()?;
        Ok(merged)
    }

    /// Validate table names, columns and index sources.
    pub fn validate(&self) -> Result<()> {
        for (i, table) in self.tables.iter().enumerate() {
            table.validate()?;
            if self.tables[..i].iter().any(|t| t.name == table.name) {
                return Err(GlaiveError::schema(format!(
                    "table '{}' is defined more than once",
                    table.name
                )));
            }
        }

        for table in &self.tables {
            for index in &table.indexes {
                let name = index.resolved_name()?;
                let sources = index.source_columns()?;
                self.validate_sources(&table.name, &name, &sources)?;
            }
        }
        Ok(())
    }

    fn validate_sources(&self, lexicon: &str, index: &str, sources: &[SourceColumn]) -> Result<()> {
        let Some(first) = sources.first() else {
            return Err(GlaiveError::schema(format!(
                "index '{lexicon}.{index}' has no source column"
            )));
        };

        for source in sources {
            if source.table != first.table {
                return Err(GlaiveError::schema(format!(
                    "index '{lexicon}.{index}' mixes source tables '{}' and '{}'",
                    first.table, source.table
                )));
            }
            let table = self.get_table(&source.table).ok_or_else(|| {
                GlaiveError::schema(format!(
                    "index '{lexicon}.{index}' refers to unknown table '{}'",
                    source.table
                ))
            })?;
            if table.get_column(&source.column).is_none() {
                return Err(GlaiveError::schema(format!(
                    "index '{lexicon}.{index}' refers to unknown column '{source}'"
                )));
            }
            if sources.iter().filter(|s| *s == source).count() > 1 {
                return Err(GlaiveError::schema(format!(
                    "index '{lexicon}.{index}' lists '{source}' twice"
                )));
            }
        }
        Ok(())
    }
}

/// A builder for constructing schemas in a fluent manner.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder.
    pub fn new() -> Self {
        SchemaBuilder {
            schema: Schema::new(),
        }
    }

    /// Add a table definition.
    pub fn create_table(mut self, table: TableDefinition) -> Self {
        self.schema.tables.push(table);
        self
    }

    /// Build the final schema.
    pub fn build(self) -> Result<Schema> {
        self.schema.validate()?;
        Ok(self.schema)
    }

    /// Build without validating.
    ///
    /// For schemas whose indexes refer to tables of a schema they will be
    /// merged into; the merge validates the result.
    pub fn build_partial(self) -> Schema {
        self.schema
    }
}
