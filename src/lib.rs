//! # Glaive
//!
//! An inverted index engine with keyed tables and positional posting lists.
//!
//! ## Features
//!
//! - Hash and patricia trie keyed tables
//! - Bigram, n-gram, whitespace and Unicode word tokenizers
//! - Multi-section index columns with positions and weights
//! - Index cursors that flatten the postings of a term cursor
//! - Pluggable storage backends with slot accounting

pub mod analysis;
pub mod database;
pub mod error;
pub mod lexical;
pub mod schema;
pub mod storage;

pub mod prelude {
    pub use crate::analysis::tokenizer::{Tokenizer, TokenizerKind};
    pub use crate::database::{
        Database, DatabaseConfig, IndexRef, Record, TableCursor, TableCursorOptions, TableRef,
        Value, WeightedElement,
    };
    pub use crate::error::{GlaiveError, Result};
    pub use crate::lexical::cursor::{
        CursorState, IndexCursor, IndexCursorOptions, PostingMode, TermIdList, TermSource,
    };
    pub use crate::lexical::dictionary::{KeyRange, Order};
    pub use crate::lexical::posting::Posting;
    pub use crate::schema::{ColumnDefinition, IndexDefinition, Schema, TableDefinition, TableType};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
