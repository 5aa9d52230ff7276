//! Data and index column definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};

/// Value type of a data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Text of at most 4095 bytes.
    ShortText,
    /// Text of at most 65535 bytes.
    Text,
    /// Text of at most 2 GiB.
    LongText,
}

impl ColumnType {
    /// Maximum length of one value (or vector element) in bytes.
    pub fn max_len(&self) -> usize {
        match self {
            ColumnType::ShortText => 4095,
            ColumnType::Text => 65535,
            ColumnType::LongText => (1 << 31) - 1,
        }
    }
}

/// Definition of a data column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Element type.
    pub column_type: ColumnType,
    /// Whether the column holds a vector of elements.
    pub vector: bool,
    /// Whether each vector element carries a weight.
    pub with_weight: bool,
}

impl ColumnDefinition {
    /// Create a scalar column of the given type.
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType) -> Self {
        ColumnDefinition {
            name: name.into(),
            column_type,
            vector: false,
            with_weight: false,
        }
    }

    /// Create a short text column.
    pub fn short_text<S: Into<String>>(name: S) -> Self {
        Self::new(name, ColumnType::ShortText)
    }

    /// Create a text column.
    pub fn text<S: Into<String>>(name: S) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Create a long text column.
    pub fn long_text<S: Into<String>>(name: S) -> Self {
        Self::new(name, ColumnType::LongText)
    }

    /// Make this a vector column.
    pub fn vector(mut self) -> Self {
        self.vector = true;
        self
    }

    /// Make this a weight vector column. Implies [`ColumnDefinition::vector`].
    pub fn with_weight(mut self) -> Self {
        self.vector = true;
        self.with_weight = true;
        self
    }
}

/// A `Table.column` reference naming the source of an index column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceColumn {
    /// Source table name.
    pub table: String,
    /// Source column name.
    pub column: String,
}

impl FromStr for SourceColumn {
    type Err = GlaiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((table, column))
                if !table.is_empty() && !column.is_empty() && !column.contains('.') =>
            {
                Ok(SourceColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                })
            }
            _ => Err(GlaiveError::schema(format!(
                "index source '{s}' must have the form 'Table.column'"
            ))),
        }
    }
}

impl fmt::Display for SourceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Definition of an index column.
///
/// An index column lives in a lexicon table (whose records are the terms)
/// and indexes one or more data columns of a single source table. The
/// 1-based position of a source in [`IndexDefinition::sources`] is the
/// section id its postings carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Explicit column name; required when there is more than one source.
    pub name: Option<String>,
    /// Source columns as `Table.column`.
    pub sources: Vec<String>,
    /// Record token positions. `None` means "when the lexicon has a tokenizer".
    pub with_position: Option<bool>,
    /// Copy element weights of weight vector sources into postings.
    pub with_weight: bool,
}

impl IndexDefinition {
    /// Create an index over a single `Table.column` source.
    pub fn new<S: Into<String>>(source: S) -> Self {
        IndexDefinition {
            name: None,
            sources: vec![source.into()],
            with_position: None,
            with_weight: false,
        }
    }

    /// Create a multi-section index with an explicit name.
    pub fn multi<N, I, S>(name: N, sources: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexDefinition {
            name: Some(name.into()),
            sources: sources.into_iter().map(Into::into).collect(),
            with_position: None,
            with_weight: false,
        }
    }

    /// Set the column name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable position recording.
    pub fn with_position(mut self, with_position: bool) -> Self {
        self.with_position = Some(with_position);
        self
    }

    /// Store element weights in postings.
    pub fn with_weight(mut self) -> Self {
        self.with_weight = true;
        self
    }

    /// Parsed source columns.
    pub fn source_columns(&self) -> Result<Vec<SourceColumn>> {
        self.sources.iter().map(|s| s.parse()).collect()
    }

    /// The column name: the explicit name, or `{Table}_{column}` for a
    /// single source.
    pub fn resolved_name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        match self.sources.as_slice() {
            [source] => {
                let source: SourceColumn = source.parse()?;
                Ok(format!("{}_{}", source.table, source.column))
            }
            [] => Err(GlaiveError::schema("index column needs at least one source")),
            _ => Err(GlaiveError::schema(format!(
                "index over {} sources needs an explicit name",
                self.sources.len()
            ))),
        }
    }
}
