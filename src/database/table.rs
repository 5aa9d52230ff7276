//! Tables, records and read-only table handles.

use std::fmt;
use std::sync::Arc;

use crate::analysis::tokenizer::Tokenizer;
use crate::database::Database;
use crate::database::cursor::{TableCursor, TableCursorOptions};
use crate::database::index::{IndexColumn, IndexRef};
use crate::database::value::Value;
use crate::error::{GlaiveError, Result};
use crate::lexical::dictionary::TermDictionary;
use crate::lexical::{RecordId, SectionId};
use crate::schema::{ColumnDefinition, TableDefinition, TableType};
use crate::storage::{SlotKind, Storage};

/// Where a data column feeds an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexLink {
    pub(crate) lexicon: usize,
    pub(crate) index: usize,
    pub(crate) section: SectionId,
}

#[derive(Debug)]
pub(crate) struct DataColumn {
    pub(crate) definition: ColumnDefinition,
    values: Vec<Option<Value>>,
    pub(crate) indexed_by: Vec<IndexLink>,
}

impl DataColumn {
    fn new(definition: ColumnDefinition) -> Self {
        DataColumn {
            definition,
            values: Vec::new(),
            indexed_by: Vec::new(),
        }
    }

    pub(crate) fn get(&self, record_id: RecordId) -> Option<&Value> {
        let slot = (record_id as usize).checked_sub(1)?;
        self.values.get(slot)?.as_ref()
    }

    pub(crate) fn set(&mut self, record_id: RecordId, value: Value) {
        let Some(slot) = (record_id as usize).checked_sub(1) else {
            return;
        };
        if self.values.len() <= slot {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = Some(value);
    }

    /// Every stored `(record_id, value)` pair in id order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (RecordId, &Value)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| value.as_ref().map(|v| (slot as RecordId + 1, v)))
    }
}

/// A keyed table: its key dictionary, data columns and, for lexicons, index
/// columns.
#[derive(Debug)]
pub(crate) struct Table {
    pub(crate) definition: TableDefinition,
    pub(crate) keys: TermDictionary,
    pub(crate) columns: Vec<DataColumn>,
    pub(crate) indexes: Vec<IndexColumn>,
    pub(crate) tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Table {
    pub(crate) fn create(definition: TableDefinition, storage: Arc<dyn Storage>) -> Result<Self> {
        let slot_kind = if definition.indexes.is_empty() {
            SlotKind::Record
        } else {
            SlotKind::Term
        };
        let tokenizer = definition
            .default_tokenizer
            .as_ref()
            .map(|kind| kind.build())
            .transpose()?;
        let keys = TermDictionary::new(
            definition.name.clone(),
            definition.table_type,
            definition.key_type,
            slot_kind,
            storage,
        );
        let columns = definition
            .columns
            .iter()
            .cloned()
            .map(DataColumn::new)
            .collect();

        Ok(Table {
            definition,
            keys,
            columns,
            indexes: Vec::new(),
            tokenizer,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.definition.name
    }

    pub(crate) fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.definition.name == name)
            .ok_or_else(|| GlaiveError::not_found(format!("column '{}.{name}'", self.name())))
    }

    pub(crate) fn check_record(&self, record_id: RecordId) -> Result<()> {
        if self.keys.contains_id(record_id) {
            Ok(())
        } else {
            Err(GlaiveError::not_found(format!(
                "record {record_id} of '{}'",
                self.name()
            )))
        }
    }
}

/// Read-only handle to a table of a [`crate::database::Database`].
#[derive(Clone, Copy)]
pub struct TableRef<'db> {
    db: &'db Database,
    table: &'db Table,
}

impl fmt::Debug for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRef")
            .field("name", &self.name())
            .field("records", &self.len())
            .finish()
    }
}

impl<'db> TableRef<'db> {
    pub(crate) fn new(db: &'db Database, table: &'db Table) -> Self {
        TableRef { db, table }
    }

    pub(crate) fn table(&self) -> &'db Table {
        self.table
    }

    /// Table name.
    pub fn name(&self) -> &'db str {
        &self.table.definition.name
    }

    /// The definition the table was created from.
    pub fn definition(&self) -> &'db TableDefinition {
        &self.table.definition
    }

    pub fn table_type(&self) -> TableType {
        self.table.definition.table_type
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.table.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.keys.is_empty()
    }

    /// Record with the given key.
    pub fn get(&self, key: &str) -> Option<Record<'db>> {
        self.table
            .keys
            .lookup(key)
            .map(|id| Record::new(self.table, id))
    }

    /// Record with the given id.
    pub fn record(&self, record_id: RecordId) -> Result<Record<'db>> {
        self.table.check_record(record_id)?;
        Ok(Record::new(self.table, record_id))
    }

    /// Index column `name` of this lexicon.
    pub fn index(&self, name: &str) -> Result<IndexRef<'db>> {
        self.table
            .indexes
            .iter()
            .find(|index| index.name == name)
            .map(|column| IndexRef::new(self.db, self.table, column))
            .ok_or_else(|| GlaiveError::not_found(format!("index column '{}.{name}'", self.name())))
    }

    /// Names of the index columns of this lexicon.
    pub fn index_names(&self) -> Vec<&'db str> {
        self.table.indexes.iter().map(|i| i.name.as_str()).collect()
    }

    /// Open a cursor over the records selected by `options`.
    pub fn open_cursor(&self, options: TableCursorOptions) -> Result<TableCursor<'db>> {
        TableCursor::open(*self, &options)
    }

    /// Run `f` with a cursor that is closed when `f` returns, whether it
    /// succeeds or not.
    pub fn with_cursor<T, F>(&self, options: TableCursorOptions, f: F) -> Result<T>
    where
        F: FnOnce(&mut TableCursor<'db>) -> Result<T>,
    {
        let mut cursor = self.open_cursor(options)?;
        let result = f(&mut cursor);
        cursor.close();
        result
    }
}

/// One record of a table.
#[derive(Clone, Copy)]
pub struct Record<'db> {
    table: &'db Table,
    id: RecordId,
}

impl<'db> Record<'db> {
    pub(crate) fn new(table: &'db Table, id: RecordId) -> Self {
        Record { table, id }
    }

    /// Record id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Record key.
    pub fn key(&self) -> &'db str {
        self.table.keys.key(self.id).unwrap_or_default()
    }

    /// Name of the owning table.
    pub fn table_name(&self) -> &'db str {
        self.table.name()
    }

    /// Value of `column`, `None` when never set.
    pub fn value(&self, column: &str) -> Result<Option<&'db Value>> {
        let index = self.table.column_index(column)?;
        Ok(self.table.columns[index].get(self.id))
    }

    /// Text of a scalar `column`, `None` when never set.
    pub fn text(&self, column: &str) -> Result<Option<&'db str>> {
        Ok(self.value(column)?.and_then(Value::as_text))
    }
}

impl PartialEq for Record<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.id == other.id
    }
}

impl Eq for Record<'_> {}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table_name())
            .field("id", &self.id)
            .field("key", &self.key())
            .finish()
    }
}
