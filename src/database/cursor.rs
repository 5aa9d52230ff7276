//! Table cursors.

use std::iter::FusedIterator;

use crate::database::table::{Record, TableRef};
use crate::error::Result;
use crate::lexical::TermId;
use crate::lexical::cursor::{CursorState, TermSource};
use crate::lexical::dictionary::{CursorOptions, TermCursor};

/// Options for [`TableCursor`]: key range, direction, offset and limit.
pub type TableCursorOptions = CursorOptions;

/// Cursor over the records of a table.
///
/// Hash tables enumerate in id order, patricia trie tables in key order.
/// A table cursor over a lexicon can drive an
/// [`crate::lexical::cursor::IndexCursor`].
#[derive(Debug)]
pub struct TableCursor<'db> {
    table: TableRef<'db>,
    inner: TermCursor<'db>,
}

impl<'db> TableCursor<'db> {
    pub(crate) fn open(table: TableRef<'db>, options: &TableCursorOptions) -> Result<Self> {
        let inner = table.table().keys.open_cursor(options)?;
        Ok(TableCursor { table, inner })
    }

    /// The table being enumerated.
    pub fn table(&self) -> TableRef<'db> {
        self.table
    }

    /// Move to the next record.
    ///
    /// Returns `Ok(None)` once at the end; advancing further, or after close,
    /// fails with `InvalidState`.
    pub fn advance(&mut self) -> Result<Option<Record<'db>>> {
        let table = self.table.table();
        Ok(self
            .inner
            .advance()?
            .map(|(id, _)| Record::new(table, id)))
    }

    /// The current record.
    pub fn current(&self) -> Result<Record<'db>> {
        let (id, _) = self.inner.current()?;
        Ok(Record::new(self.table.table(), id))
    }

    /// Records not yet yielded.
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    pub fn state(&self) -> CursorState {
        self.inner.state()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Release the storage handle. Idempotent and infallible.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

/// Yields the remaining records. A closed or exhausted cursor yields nothing;
/// use [`TableCursor::advance`] to observe those states as errors.
impl<'db> Iterator for TableCursor<'db> {
    type Item = Record<'db>;

    fn next(&mut self) -> Option<Record<'db>> {
        let table = self.table.table();
        self.inner.next().map(|(id, _)| Record::new(table, id))
    }
}

impl FusedIterator for TableCursor<'_> {}

impl TermSource for TableCursor<'_> {
    fn next_term_id(&mut self) -> Result<Option<TermId>> {
        self.inner.next_term_id()
    }

    fn lexicon_name(&self) -> Option<&str> {
        Some(self.table.name())
    }
}
