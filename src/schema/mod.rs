//! Schema module for Glaive.
//!
//! A schema declares keyed tables, their typed data columns, and the index
//! columns that live in lexicon tables and point back at data columns of a
//! source table.

pub mod column;
#[allow(clippy::module_inception)]
pub mod schema;
pub mod table;

// Re-export commonly used types
pub use column::{ColumnDefinition, ColumnType, IndexDefinition, SourceColumn};
pub use schema::{Schema, SchemaBuilder};
pub use table::{KeyType, TableDefinition, TableType};
