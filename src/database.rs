//! Database handle.
//!
//! A [`Database`] owns the storage backend and every table defined on it.
//! Writes take `&mut self`; reads hand out [`TableRef`] and [`IndexRef`]
//! handles that borrow the database, so an open cursor keeps it from being
//! modified underneath.
//!
//! Setting a value of an indexed column keeps every index over that column
//! in step: the postings of the old value are removed and the new value is
//! indexed under the same record and section.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::lexical::writer::{IndexStats, IndexWriter};
use crate::lexical::{RecordId, SectionId};
use crate::schema::{IndexDefinition, Schema};
use crate::storage::{SlotKind, Storage, StorageConfig, StorageFactory, StorageStats};

pub mod cursor;
pub mod index;
pub mod table;
pub mod value;

pub use cursor::{TableCursor, TableCursorOptions};
pub use index::IndexRef;
pub use table::{Record, TableRef};
pub use value::{Value, WeightedElement};

use index::IndexColumn;
use table::{IndexLink, Table};

/// Database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Storage backend.
    pub storage: StorageConfig,
}

impl DatabaseConfig {
    /// Parse a configuration from JSON.
    ///
    /// ```
    /// use glaive::database::DatabaseConfig;
    /// use glaive::storage::StorageConfig;
    ///
    /// let config = DatabaseConfig::from_json(
    ///     r#"{"storage":{"type":"memory","max_posting_slots":1000}}"#,
    /// )
    /// .unwrap();
    /// let StorageConfig::Memory(memory) = config.storage;
    /// assert_eq!(memory.max_posting_slots, Some(1000));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut json = String::new();
        BufReader::new(reader).read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

/// A set of keyed tables sharing one storage backend.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    pub(crate) storage: Arc<dyn Storage>,
    schema: Schema,
    pub(crate) tables: Vec<Table>,
    table_ids: AHashMap<String, usize>,
}

impl Database {
    /// Create an empty database.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let storage = StorageFactory::create(config.storage.clone())?;
        Ok(Database {
            config,
            storage,
            schema: Schema::new(),
            tables: Vec::new(),
            table_ids: AHashMap::new(),
        })
    }

    /// Create an empty database on unbounded in-memory storage.
    pub fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::default())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Every table definition so far.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Storage usage.
    pub fn storage_stats(&self) -> StorageStats {
        self.storage.stats()
    }

    /// Table names in definition order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(Table::name).collect()
    }

    /// Add the tables of `schema`.
    ///
    /// Index sources may name tables defined earlier or in the same schema.
    /// A new index over a table that already holds records indexes them
    /// immediately. On error the database is left as it was.
    pub fn define(&mut self, schema: &Schema) -> Result<()> {
        let merged = self.schema.merge(schema)?;
        let created = schema
            .tables()
            .iter()
            .map(|definition| Table::create(definition.clone(), self.storage.clone()))
            .collect::<Result<Vec<_>>>()?;

        let first_new = self.tables.len();
        for table in created {
            self.table_ids
                .insert(table.name().to_string(), self.tables.len());
            self.tables.push(table);
        }

        for lexicon in first_new..self.tables.len() {
            let definitions = self.tables[lexicon].definition.indexes.clone();
            for definition in &definitions {
                if let Err(e) = self.attach_index(lexicon, definition) {
                    self.rollback_define(first_new);
                    return Err(e);
                }
            }
        }

        self.schema = merged;
        info!(
            "defined {} table(s), {} in total",
            schema.len(),
            self.tables.len()
        );
        Ok(())
    }

    fn attach_index(&mut self, lexicon: usize, definition: &IndexDefinition) -> Result<()> {
        let name = definition.resolved_name()?;
        let sources = definition.source_columns()?;
        let first = sources.first().ok_or_else(|| {
            GlaiveError::schema(format!("index column '{name}' has no source"))
        })?;
        let source_table = self.table_index(&first.table)?;
        let columns = sources
            .iter()
            .map(|source| self.tables[source_table].column_index(&source.column))
            .collect::<Result<Vec<_>>>()?;

        let with_position = definition
            .with_position
            .unwrap_or(self.tables[lexicon].tokenizer.is_some());
        let column = IndexColumn::new(
            self.tables[lexicon].name(),
            name,
            definition.clone(),
            source_table,
            with_position,
            self.storage.clone(),
        );
        let full_name = column.full_name.clone();
        let index = self.tables[lexicon].indexes.len();
        self.tables[lexicon].indexes.push(column);

        let mut stats = IndexStats::default();
        for (section, &column) in columns.iter().enumerate() {
            let link = IndexLink {
                lexicon,
                index,
                section: section as SectionId + 1,
            };
            let existing: Vec<(RecordId, Value)> = self.tables[source_table].columns[column]
                .entries()
                .map(|(record_id, value)| (record_id, value.clone()))
                .collect();
            self.tables[source_table].columns[column]
                .indexed_by
                .push(link);

            for (record_id, value) in &existing {
                let added = self.index_writer(link).index_elements(
                    *record_id,
                    link.section,
                    &value.elements(),
                )?;
                stats.terms_created += added.terms_created;
                stats.postings_added += added.postings_added;
            }
        }

        info!(
            "defined index {full_name} over {}: {} posting(s), {} term(s) from existing records",
            definition.sources.join(", "),
            stats.postings_added,
            stats.terms_created
        );
        Ok(())
    }

    fn rollback_define(&mut self, first_new: usize) {
        for table in self.tables.drain(first_new..) {
            self.storage.release(table.keys.slot_kind(), table.keys.len());
            for index in &table.indexes {
                self.storage.release(SlotKind::Posting, index.postings.len());
            }
            self.table_ids.remove(table.name());
        }
        for table in &mut self.tables {
            for column in &mut table.columns {
                column.indexed_by.retain(|link| link.lexicon < first_new);
            }
        }
        warn!("rolled back table definitions after a failed define");
    }

    fn table_index(&self, name: &str) -> Result<usize> {
        self.table_ids
            .get(name)
            .copied()
            .ok_or_else(|| GlaiveError::not_found(format!("table '{name}'")))
    }

    /// Handle to table `name`.
    pub fn table(&self, name: &str) -> Result<TableRef<'_>> {
        let table = &self.tables[self.table_index(name)?];
        Ok(TableRef::new(self, table))
    }

    /// Handle to index column `Lexicon.column`, e.g. `Terms.Articles_content`.
    pub fn index(&self, name: &str) -> Result<IndexRef<'_>> {
        let (lexicon, column) = index::split_full_name(name)?;
        self.table(lexicon)?.index(column)
    }

    /// Add a record, or find it when `key` exists, then set `values`.
    ///
    /// Every value is checked against its column before anything is
    /// written.
    pub fn add<'v, I>(&mut self, table: &str, key: &str, values: I) -> Result<RecordId>
    where
        I: IntoIterator<Item = (&'v str, Value)>,
    {
        let t = self.table_index(table)?;
        let mut checked = Vec::new();
        for (column, value) in values {
            let c = self.tables[t].column_index(column)?;
            let value = value.conform(&self.tables[t].columns[c].definition)?;
            checked.push((c, value));
        }

        let record_id = self.tables[t].keys.resolve_or_create(key)?;
        for (c, value) in checked {
            self.store_value(t, record_id, c, value)?;
        }
        debug!("added '{key}' to {table} as record {record_id}");
        Ok(record_id)
    }

    /// Set one column value of an existing record, re-indexing it.
    pub fn set_value<V: Into<Value>>(
        &mut self,
        table: &str,
        record_id: RecordId,
        column: &str,
        value: V,
    ) -> Result<()> {
        let t = self.table_index(table)?;
        self.tables[t].check_record(record_id)?;
        let c = self.tables[t].column_index(column)?;
        let value = value.into().conform(&self.tables[t].columns[c].definition)?;
        self.store_value(t, record_id, c, value)
    }

    /// Value of `column` of record `record_id`, `None` when never set.
    pub fn get_value(&self, table: &str, record_id: RecordId, column: &str) -> Result<Option<&Value>> {
        self.table(table)?.record(record_id)?.value(column)
    }

    fn store_value(&mut self, t: usize, record_id: RecordId, c: usize, value: Value) -> Result<()> {
        let old = self.tables[t].columns[c].get(record_id).cloned();
        let links = self.tables[t].columns[c].indexed_by.clone();

        for (done, &link) in links.iter().enumerate() {
            if let Err(e) = self.replace_postings(link, record_id, old.as_ref(), Some(&value)) {
                for &undo in links[..done].iter().rev() {
                    if let Err(undo_err) =
                        self.replace_postings(undo, record_id, Some(&value), old.as_ref())
                    {
                        warn!("failed to restore postings of record {record_id}: {undo_err}");
                    }
                }
                return Err(e);
            }
        }

        self.tables[t].columns[c].set(record_id, value);
        Ok(())
    }

    /// Swap the postings of `old` for those of `new` in one index section.
    fn replace_postings(
        &mut self,
        link: IndexLink,
        record_id: RecordId,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> Result<()> {
        if let Some(old) = old {
            self.index_writer(link)
                .unindex_elements(record_id, link.section, &old.elements())?;
        }
        let Some(new) = new else {
            return Ok(());
        };
        if let Err(e) = self
            .index_writer(link)
            .index_elements(record_id, link.section, &new.elements())
        {
            if let Some(old) = old {
                if let Err(restore) =
                    self.index_writer(link)
                        .index_elements(record_id, link.section, &old.elements())
                {
                    warn!("failed to restore postings of record {record_id}: {restore}");
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn index_writer(&mut self, link: IndexLink) -> IndexWriter<'_> {
        let storage = self.storage.as_ref();
        let Table {
            keys,
            indexes,
            tokenizer,
            ..
        } = &mut self.tables[link.lexicon];
        let column = &mut indexes[link.index];
        let (with_position, with_weight) = (column.with_position, column.with_weight);
        IndexWriter::new(keys, &mut column.postings, storage)
            .tokenizer(tokenizer.as_deref())
            .with_position(with_position)
            .with_weight(with_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizerKind;
    use crate::error::ErrorKind;
    use crate::schema::TableDefinition;
    use crate::storage::memory::MemoryStorageConfig;

    fn articles_schema() -> Schema {
        Schema::builder()
            .create_table(TableDefinition::new("Articles").text("content"))
            .create_table(
                TableDefinition::new("Terms")
                    .default_tokenizer(TokenizerKind::BigramSplitSymbolAlpha)
                    .index(IndexDefinition::new("Articles.content")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_is_idempotent_on_key() {
        let mut db = Database::in_memory().unwrap();
        db.define(&articles_schema()).unwrap();

        let first = db.add("Articles", "1", [("content", Value::from("l"))]).unwrap();
        let again = db.add("Articles", "1", Vec::new()).unwrap();
        assert_eq!(first, again);
        assert_eq!(db.table("Articles").unwrap().len(), 1);
        assert_eq!(
            db.get_value("Articles", first, "content").unwrap(),
            Some(&Value::from("l"))
        );
    }

    #[test]
    fn test_unknown_names() {
        let mut db = Database::in_memory().unwrap();
        db.define(&articles_schema()).unwrap();

        assert_eq!(db.table("Nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            db.index("Terms.nope").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.add("Articles", "1", [("missing", Value::from("x"))])
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.set_value("Articles", 9, "content", "x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_define_indexes_existing_records() {
        let mut db = Database::in_memory().unwrap();
        db.define(
            &Schema::builder()
                .create_table(TableDefinition::new("Articles").text("content"))
                .build()
                .unwrap(),
        )
        .unwrap();
        db.add("Articles", "1", [("content", Value::from("hello"))]).unwrap();

        db.define(
            &Schema::builder()
                .create_table(
                    TableDefinition::new("Terms")
                        .default_tokenizer(TokenizerKind::BigramSplitSymbolAlpha)
                        .index(IndexDefinition::new("Articles.content")),
                )
                .build_partial(),
        )
        .unwrap();

        let index = db.index("Terms.Articles_content").unwrap();
        assert_eq!(index.stats().postings, 5);
        assert_eq!(db.table("Terms").unwrap().len(), 5);
    }

    #[test]
    fn test_failed_define_changes_nothing() {
        let mut db = Database::new(DatabaseConfig {
            storage: StorageConfig::Memory(MemoryStorageConfig {
                max_posting_slots: Some(2),
                ..Default::default()
            }),
        })
        .unwrap();
        db.define(
            &Schema::builder()
                .create_table(TableDefinition::new("Articles").text("content"))
                .build()
                .unwrap(),
        )
        .unwrap();
        db.add("Articles", "1", [("content", Value::from("hello world again"))]).unwrap();

        let err = db
            .define(
                &Schema::builder()
                    .create_table(
                        TableDefinition::new("Terms")
                            .default_tokenizer(TokenizerKind::Bigram)
                            .index(IndexDefinition::new("Articles.content")),
                    )
                    .build_partial(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageExhausted);
        assert!(db.table("Terms").is_err());
        assert_eq!(db.schema().len(), 1);
        assert_eq!(db.storage_stats().term_slots, 0);
        assert_eq!(db.storage_stats().posting_slots, 0);
    }

    #[test]
    fn test_config_from_json() {
        let config = DatabaseConfig::from_json("{}").unwrap();
        let StorageConfig::Memory(memory) = config.storage;
        assert_eq!(memory.max_term_slots, None);
        assert!(DatabaseConfig::from_json("{").is_err());
    }

    #[test]
    fn test_config_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage":{{"type":"memory","max_term_slots":8}}}}"#).unwrap();
        let config = DatabaseConfig::from_file(file.path()).unwrap();
        let StorageConfig::Memory(memory) = config.storage;
        assert_eq!(memory.max_term_slots, Some(8));

        let config = DatabaseConfig::from_reader(&b"{}"[..]).unwrap();
        assert_eq!(Database::new(config).unwrap().table_names().len(), 0);

        let dir = tempfile::tempdir().unwrap();
        let err = DatabaseConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
