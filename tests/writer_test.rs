//! Integration tests for index maintenance: atomic writes, weight vectors,
//! multi-section indexes and updates.

use std::sync::Arc;

use glaive::analysis::tokenizer::TokenizerKind;
use glaive::database::{Database, DatabaseConfig, TableCursorOptions, Value};
use glaive::error::{ErrorKind, Result};
use glaive::lexical::cursor::IndexCursorOptions;
use glaive::lexical::dictionary::TermDictionary;
use glaive::lexical::posting::{Posting, PostingListStore};
use glaive::lexical::writer::IndexWriter;
use glaive::schema::{ColumnDefinition, IndexDefinition, KeyType, Schema, TableDefinition, TableType};
use glaive::storage::memory::{MemoryStorage, MemoryStorageConfig};
use glaive::storage::{SlotKind, Storage, StorageConfig};

/// `(record, section, term key, position, term_frequency, weight, n_rest)`
type Row = (u32, u32, String, u32, u32, u32, u32);

fn all_postings(db: &Database, lexicon: &str, index: &str) -> Result<Vec<Row>> {
    let index = db.index(&format!("{lexicon}.{index}"))?;
    let mut terms = db.table(lexicon)?.open_cursor(TableCursorOptions::new())?;
    let postings = index.with_cursor(&mut terms, IndexCursorOptions::new(), |cursor| {
        cursor.collect_all()
    })?;
    postings
        .iter()
        .map(|p: &Posting| {
            Ok((
                p.record_id,
                p.section_id,
                p.term(&index)?.key().to_string(),
                p.position,
                p.term_frequency,
                p.weight,
                p.n_rest_postings,
            ))
        })
        .collect()
}

fn row(record: u32, section: u32, term: &str, position: u32, tf: u32, weight: u32, rest: u32) -> Row {
    (record, section, term.to_string(), position, tf, weight, rest)
}

fn bigram_db(config: DatabaseConfig) -> Result<Database> {
    let mut db = Database::new(config)?;
    db.define(
        &Schema::builder()
            .create_table(TableDefinition::new("Articles").text("content"))
            .create_table(
                TableDefinition::new("Terms")
                    .default_tokenizer(TokenizerKind::BigramSplitSymbolAlpha)
                    .index(IndexDefinition::new("Articles.content")),
            )
            .build()?,
    )?;
    Ok(db)
}

fn limited(max_posting_slots: usize) -> DatabaseConfig {
    DatabaseConfig {
        storage: StorageConfig::Memory(MemoryStorageConfig {
            max_posting_slots: Some(max_posting_slots),
            ..Default::default()
        }),
    }
}

#[test]
fn test_exhausted_storage_leaves_index_intact() -> Result<()> {
    let mut db = bigram_db(limited(6))?;
    db.add("Articles", "1", [("content", Value::from("l"))])?;
    db.add("Articles", "2", [("content", Value::from("ll"))])?;
    let before = all_postings(&db, "Terms", "Articles_content")?;

    let err = db
        .add("Articles", "3", [("content", Value::from("hello"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageExhausted);

    assert_eq!(all_postings(&db, "Terms", "Articles_content")?, before);
    assert_eq!(db.table("Terms")?.len(), 2);
    assert_eq!(db.storage_stats().posting_slots, 3);
    assert_eq!(db.storage_stats().term_slots, 2);

    // The record key exists but holds no value until a write succeeds.
    let record_id = db.table("Articles")?.get("3").expect("record 3").id();
    assert_eq!(db.get_value("Articles", record_id, "content")?, None);

    db.set_value("Articles", record_id, "content", "lo")?;
    assert_eq!(db.storage_stats().posting_slots, 5);
    Ok(())
}

#[test]
fn test_malformed_input_leaves_index_intact() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new_default());
    let mut lexicon = TermDictionary::new(
        "Terms",
        TableType::Hash,
        KeyType::ShortText,
        SlotKind::Term,
        storage.clone(),
    );
    let mut postings = PostingListStore::new("Terms.Articles_content", storage.clone());
    let tokenizer = TokenizerKind::BigramSplitSymbolAlpha.build()?;
    let mut writer = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
        .tokenizer(Some(tokenizer.as_ref()));

    writer.index(1, 1, "l")?;
    let err = writer.index_bytes(2, 1, b"h\xffllo").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    writer.index_bytes(2, 1, b"ll")?;

    assert_eq!(lexicon.len(), 2);
    assert_eq!(postings.len(), 3);
    assert_eq!(storage.stats().posting_slots, 3);
    let records: Vec<u32> = postings.postings(1).map(|p| p.record_id).collect();
    assert_eq!(records, vec![1, 2]);
    Ok(())
}

#[test]
fn test_update_reindexes_in_place() -> Result<()> {
    let mut db = bigram_db(DatabaseConfig::default())?;
    db.add("Articles", "1", [("content", Value::from("l"))])?;
    let two = db.add("Articles", "2", [("content", Value::from("ll"))])?;
    db.add("Articles", "3", [("content", Value::from("hello"))])?;

    db.set_value("Articles", two, "content", "lo")?;

    assert_eq!(
        all_postings(&db, "Terms", "Articles_content")?,
        vec![
            row(1, 1, "l", 0, 1, 0, 0),
            row(3, 1, "ll", 2, 1, 0, 0),
            row(3, 1, "he", 0, 1, 0, 0),
            row(3, 1, "el", 1, 1, 0, 0),
            row(2, 1, "lo", 0, 1, 0, 0),
            row(3, 1, "lo", 3, 1, 0, 0),
            row(2, 1, "o", 1, 1, 0, 0),
            row(3, 1, "o", 4, 1, 0, 0),
        ]
    );
    assert_eq!(db.table("Terms")?.len(), 6);
    assert_eq!(db.storage_stats().posting_slots, 8);
    assert_eq!(
        db.get_value("Articles", two, "content")?,
        Some(&Value::from("lo"))
    );
    Ok(())
}

#[test]
fn test_weight_vector_postings() -> Result<()> {
    let mut db = Database::in_memory()?;
    db.define(
        &Schema::builder()
            .create_table(
                TableDefinition::new("Articles")
                    .column(ColumnDefinition::short_text("tags").with_weight()),
            )
            .create_table(
                TableDefinition::new("Tags").index(IndexDefinition::new("Articles.tags").with_weight()),
            )
            .build()?,
    )?;

    let one = db.add("Articles", "1", [("tags", Value::weighted([("rust", 3), ("db", 1)]))])?;
    let two = db.add("Articles", "2", [("tags", Value::from(vec!["rust"]))])?;

    assert_eq!(
        all_postings(&db, "Tags", "Articles_tags")?,
        vec![
            row(1, 1, "rust", 0, 1, 3, 0),
            row(2, 1, "rust", 0, 1, 0, 0),
            row(1, 1, "db", 0, 1, 1, 0),
        ]
    );
    assert_eq!(
        db.get_value("Articles", one, "tags")?,
        Some(&Value::weighted([("rust", 3), ("db", 1)]))
    );
    assert_eq!(
        db.get_value("Articles", two, "tags")?
            .and_then(|value| value.weight_at(0)),
        Some(0)
    );
    Ok(())
}

#[test]
fn test_multi_section_index() -> Result<()> {
    let mut db = Database::in_memory()?;
    db.define(
        &Schema::builder()
            .create_table(TableDefinition::new("Articles").text("title").text("content"))
            .create_table(
                TableDefinition::new("Terms")
                    .default_tokenizer(TokenizerKind::Whitespace)
                    .index(IndexDefinition::multi(
                        "article_text",
                        ["Articles.title", "Articles.content"],
                    )),
            )
            .build()?,
    )?;

    db.add(
        "Articles",
        "a",
        [
            ("title", Value::from("rust search")),
            ("content", Value::from("search engine")),
        ],
    )?;

    assert_eq!(
        all_postings(&db, "Terms", "article_text")?,
        vec![
            row(1, 1, "rust", 0, 1, 0, 0),
            row(1, 1, "search", 1, 1, 0, 0),
            row(1, 2, "search", 0, 1, 0, 0),
            row(1, 2, "engine", 1, 1, 0, 0),
        ]
    );
    let index = db.index("Terms.article_text")?;
    assert_eq!(index.sources(), ["Articles.title", "Articles.content"]);
    assert_eq!(index.source().name(), "Articles");
    Ok(())
}

#[test]
fn test_without_positions() -> Result<()> {
    let mut db = Database::in_memory()?;
    db.define(
        &Schema::builder()
            .create_table(TableDefinition::new("Articles").text("content"))
            .create_table(
                TableDefinition::new("Terms")
                    .default_tokenizer(TokenizerKind::Whitespace)
                    .index(IndexDefinition::new("Articles.content").with_position(false)),
            )
            .build()?,
    )?;
    db.add("Articles", "1", [("content", Value::from("a b a a"))])?;

    assert!(!db.index("Terms.Articles_content")?.with_position());
    assert_eq!(
        all_postings(&db, "Terms", "Articles_content")?,
        vec![row(1, 1, "a", 0, 3, 0, 0), row(1, 1, "b", 0, 1, 0, 0)]
    );
    Ok(())
}

#[test]
fn test_vector_positions_continue_across_elements() -> Result<()> {
    let mut db = Database::in_memory()?;
    db.define(
        &Schema::builder()
            .create_table(
                TableDefinition::new("Articles")
                    .column(ColumnDefinition::text("paragraphs").vector()),
            )
            .create_table(
                TableDefinition::new("Terms")
                    .default_tokenizer(TokenizerKind::Whitespace)
                    .index(IndexDefinition::new("Articles.paragraphs")),
            )
            .build()?,
    )?;
    db.add("Articles", "1", [("paragraphs", Value::from(vec!["a b", "c a"]))])?;

    assert_eq!(
        all_postings(&db, "Terms", "Articles_paragraphs")?,
        vec![
            row(1, 1, "a", 0, 2, 0, 1),
            row(1, 1, "a", 3, 2, 0, 0),
            row(1, 1, "b", 1, 1, 0, 0),
            row(1, 1, "c", 2, 1, 0, 0),
        ]
    );
    Ok(())
}

#[test]
fn test_value_shape_checked_before_write() -> Result<()> {
    let mut db = bigram_db(DatabaseConfig::default())?;
    let err = db
        .add("Articles", "1", [("content", Value::from(vec!["l"]))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(db.table("Articles")?.is_empty());
    assert!(db.table("Terms")?.is_empty());
    Ok(())
}
