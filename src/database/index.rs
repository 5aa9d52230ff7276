//! Index columns and read-only index handles.

use std::fmt;
use std::sync::Arc;

use crate::database::Database;
use crate::database::table::{Record, Table, TableRef};
use crate::error::{GlaiveError, Result};
use crate::lexical::cursor::{IndexCursor, IndexCursorOptions, TermIdList, TermSource};
use crate::lexical::posting::{Posting, PostingListStore, PostingStats};
use crate::lexical::{RecordId, TermId};
use crate::schema::IndexDefinition;
use crate::storage::Storage;

/// An index column stored in a lexicon table.
#[derive(Debug)]
pub(crate) struct IndexColumn {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) definition: IndexDefinition,
    pub(crate) source_table: usize,
    pub(crate) postings: PostingListStore,
    pub(crate) with_position: bool,
    pub(crate) with_weight: bool,
}

impl IndexColumn {
    pub(crate) fn new(
        lexicon: &str,
        name: String,
        definition: IndexDefinition,
        source_table: usize,
        with_position: bool,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let full_name = format!("{lexicon}.{name}");
        let with_weight = definition.with_weight;
        IndexColumn {
            postings: PostingListStore::new(full_name.clone(), storage),
            name,
            full_name,
            definition,
            source_table,
            with_position,
            with_weight,
        }
    }
}

/// Read-only handle to an index column.
///
/// Obtained from [`Database::index`] with a `Lexicon.column` name or from
/// [`TableRef::index`] on the lexicon.
#[derive(Clone, Copy)]
pub struct IndexRef<'db> {
    db: &'db Database,
    lexicon: &'db Table,
    column: &'db IndexColumn,
    source: &'db Table,
}

impl fmt::Debug for IndexRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexRef")
            .field("name", &self.full_name())
            .field("sources", &self.sources())
            .field("postings", &self.column.postings.len())
            .finish()
    }
}

impl<'db> IndexRef<'db> {
    pub(crate) fn new(db: &'db Database, lexicon: &'db Table, column: &'db IndexColumn) -> Self {
        IndexRef {
            db,
            lexicon,
            column,
            source: &db.tables[column.source_table],
        }
    }

    /// Column name within the lexicon.
    pub fn name(&self) -> &'db str {
        &self.column.name
    }

    /// `Lexicon.column`.
    pub fn full_name(&self) -> &'db str {
        &self.column.full_name
    }

    /// Name of the lexicon table holding the terms.
    pub fn lexicon_name(&self) -> &'db str {
        self.lexicon.name()
    }

    /// Source columns as `Table.column`, in section order.
    pub fn sources(&self) -> &'db [String] {
        &self.column.definition.sources
    }

    /// Whether postings carry token positions.
    pub fn with_position(&self) -> bool {
        self.column.with_position
    }

    /// Whether postings carry element weights.
    pub fn with_weight(&self) -> bool {
        self.column.with_weight
    }

    /// The lexicon table.
    pub fn lexicon(&self) -> TableRef<'db> {
        TableRef::new(self.db, self.lexicon)
    }

    /// The table whose records the postings point at.
    pub fn source(&self) -> TableRef<'db> {
        TableRef::new(self.db, self.source)
    }

    pub(crate) fn storage(&self) -> Arc<dyn Storage> {
        self.db.storage.clone()
    }

    pub(crate) fn postings(&self) -> &'db PostingListStore {
        &self.column.postings
    }

    /// Posting store statistics.
    pub fn stats(&self) -> PostingStats {
        self.column.postings.stats()
    }

    /// Number of postings stored for `term_id`.
    pub fn estimate_size(&self, term_id: TermId) -> usize {
        self.column.postings.list(term_id).map_or(0, |list| list.len())
    }

    /// Source record `record_id`.
    pub fn record(&self, record_id: RecordId) -> Result<Record<'db>> {
        self.source.check_record(record_id)?;
        Ok(Record::new(self.source, record_id))
    }

    /// Lexicon record of `term_id`.
    pub fn term(&self, term_id: TermId) -> Result<Record<'db>> {
        self.lexicon.check_record(term_id)?;
        Ok(Record::new(self.lexicon, term_id))
    }

    /// Ids of the given term keys, skipping keys the lexicon lacks.
    pub fn term_ids<'k, I>(&self, keys: I) -> TermIdList
    where
        I: IntoIterator<Item = &'k str>,
    {
        TermIdList::for_lexicon(
            self.lexicon_name(),
            keys.into_iter().filter_map(|key| self.lexicon.keys.lookup(key)),
        )
    }

    /// Open a cursor over the postings of the terms `source` yields.
    ///
    /// `source` is typically a cursor over the lexicon table, passed by
    /// mutable reference so the caller keeps ownership of it. A source that
    /// names a different lexicon is rejected.
    pub fn open_cursor<S: TermSource>(
        &self,
        source: S,
        options: IndexCursorOptions,
    ) -> Result<IndexCursor<'db, S>> {
        IndexCursor::open(*self, source, options)
    }

    /// Run `f` with an index cursor that is closed when `f` returns, whether
    /// it succeeds or not. The source is not closed.
    pub fn with_cursor<S, T, F>(&self, source: S, options: IndexCursorOptions, f: F) -> Result<T>
    where
        S: TermSource,
        F: FnOnce(&mut IndexCursor<'db, S>) -> Result<T>,
    {
        let mut cursor = self.open_cursor(source, options)?;
        let result = f(&mut cursor);
        cursor.close();
        result
    }
}

impl Posting {
    /// Source record of this posting.
    pub fn record<'db>(&self, index: &IndexRef<'db>) -> Result<Record<'db>> {
        index.record(self.record_id)
    }

    /// Lexicon record of this posting's term.
    pub fn term<'db>(&self, index: &IndexRef<'db>) -> Result<Record<'db>> {
        index.term(self.term_id)
    }
}

pub(crate) fn split_full_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once('.') {
        Some((lexicon, column)) if !lexicon.is_empty() && !column.is_empty() => {
            Ok((lexicon, column))
        }
        _ => Err(GlaiveError::invalid_argument(format!(
            "index name '{name}' must have the form 'Lexicon.column'"
        ))),
    }
}
