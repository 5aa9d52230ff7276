//! Table definitions.

use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::TokenizerKind;
use crate::error::{GlaiveError, Result};
use crate::schema::column::{ColumnDefinition, IndexDefinition};

/// How a table organises its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    /// Hash-keyed table. Cursors enumerate records in ID (insertion) order.
    #[default]
    Hash,
    /// Patricia-trie keyed table. Cursors enumerate records in lexical byte
    /// order of their keys.
    PatriciaTrie,
}

/// Type of a table's record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Keys of at most 4095 bytes.
    #[default]
    ShortText,
    /// Keys of at most 65535 bytes.
    Text,
}

impl KeyType {
    /// Maximum key length in bytes.
    pub fn max_len(&self) -> usize {
        match self {
            KeyType::ShortText => 4095,
            KeyType::Text => 65535,
        }
    }

    /// Check a key against this type.
    pub fn validate(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(GlaiveError::invalid_argument("record key must not be empty"));
        }
        if key.len() > self.max_len() {
            return Err(GlaiveError::invalid_argument(format!(
                "key of {} bytes exceeds the {} byte limit of {self:?}",
                key.len(),
                self.max_len()
            )));
        }
        Ok(())
    }
}

/// Definition of one keyed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Key organisation.
    pub table_type: TableType,
    /// Key type.
    pub key_type: KeyType,
    /// Tokenizer applied when this table is used as an index lexicon.
    pub default_tokenizer: Option<TokenizerKind>,
    /// Data columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Index columns in declaration order.
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// Create a hash table with short text keys and no columns.
    pub fn new<S: Into<String>>(name: S) -> Self {
        TableDefinition {
            name: name.into(),
            table_type: TableType::default(),
            key_type: KeyType::default(),
            default_tokenizer: None,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Set the table type.
    pub fn table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Set the key type.
    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Set the tokenizer used when this table is an index lexicon.
    pub fn default_tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.default_tokenizer = Some(tokenizer);
        self
    }

    /// Add a data column.
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a short text column.
    pub fn short_text<S: Into<String>>(self, name: S) -> Self {
        self.column(ColumnDefinition::short_text(name))
    }

    /// Add a text column.
    pub fn text<S: Into<String>>(self, name: S) -> Self {
        self.column(ColumnDefinition::text(name))
    }

    /// Add an index column.
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Look up a data column definition.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Validate the table in isolation (names and column uniqueness).
    pub fn validate(&self) -> Result<()> {
        validate_name("table", &self.name)?;

        let mut seen = Vec::with_capacity(self.columns.len() + self.indexes.len());
        for column in &self.columns {
            validate_name("column", &column.name)?;
            seen.push(column.name.clone());
        }
        for index in &self.indexes {
            let name = index.resolved_name()?;
            validate_name("index column", &name)?;
            seen.push(name);
        }

        let mut sorted = seen.clone();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(GlaiveError::schema(format!(
                "column '{}.{}' is defined more than once",
                self.name, pair[0]
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GlaiveError::schema(format!("{what} name cannot be empty")));
    }
    if name.contains('.') {
        return Err(GlaiveError::schema(format!(
            "{what} name '{name}' must not contain '.'"
        )));
    }
    Ok(())
}
