//! Criterion benchmarks for Glaive.
//!
//! Covers the three hot paths of the engine:
//! - Tokenization
//! - Index maintenance (adding and updating records)
//! - Index cursor scans over a lexicon

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glaive::analysis::tokenizer::TokenizerKind;
use glaive::database::{Database, TableCursorOptions, Value};
use glaive::lexical::cursor::IndexCursorOptions;
use glaive::schema::{IndexDefinition, Schema, TableDefinition, TableType};
use std::hint::black_box;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "search", "engine", "inverted", "index", "posting", "lexicon", "cursor", "term",
        "record", "section", "position", "weight", "bigram", "token", "table", "column",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 20 + (i % 40);
        let doc_words: Vec<&str> = (0..doc_length)
            .map(|j| words[(i * 7 + j * 13) % words.len()])
            .collect();
        documents.push(doc_words.join(" "));
    }

    documents
}

fn schema(tokenizer: TokenizerKind, table_type: TableType) -> Schema {
    Schema::builder()
        .create_table(TableDefinition::new("Articles").text("content"))
        .create_table(
            TableDefinition::new("Terms")
                .table_type(table_type)
                .default_tokenizer(tokenizer)
                .index(IndexDefinition::new("Articles.content")),
        )
        .build()
        .unwrap()
}

fn populated(documents: &[String], table_type: TableType) -> Database {
    let mut db = Database::in_memory().unwrap();
    db.define(&schema(TokenizerKind::Whitespace, table_type))
        .unwrap();
    for (i, doc) in documents.iter().enumerate() {
        db.add("Articles", &i.to_string(), [("content", Value::from(doc.as_str()))])
            .unwrap();
    }
    db
}

/// Benchmark tokenizers on a single document.
fn bench_tokenization(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenization");
    let text = generate_test_documents(1).remove(0);

    for kind in [
        TokenizerKind::Whitespace,
        TokenizerKind::UnicodeWord,
        TokenizerKind::BigramSplitSymbolAlpha,
    ] {
        let tokenizer = kind.build().unwrap();
        group.bench_function(tokenizer.name(), |b| {
            b.iter(|| {
                let count = tokenizer.tokenize(black_box(&text)).unwrap().count();
                black_box(count)
            })
        });
    }

    group.finish();
}

/// Benchmark building an index from scratch.
fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexing");
    group.sample_size(20);

    let documents = generate_test_documents(500);
    group.throughput(Throughput::Elements(documents.len() as u64));

    for (name, kind) in [
        ("whitespace", TokenizerKind::Whitespace),
        ("bigram", TokenizerKind::BigramSplitSymbolAlpha),
    ] {
        group.bench_function(name, |b| {
            b.iter_with_setup(
                || {
                    let mut db = Database::in_memory().unwrap();
                    db.define(&schema(kind.clone(), TableType::Hash)).unwrap();
                    db
                },
                |mut db| {
                    for (i, doc) in documents.iter().enumerate() {
                        db.add("Articles", &i.to_string(), [("content", Value::from(doc.as_str()))])
                            .unwrap();
                    }
                    black_box(db);
                },
            )
        });
    }

    group.bench_function("update_record", |b| {
        let mut db = populated(&documents, TableType::Hash);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let doc = if flip { &documents[1] } else { &documents[2] };
            db.set_value("Articles", 1, "content", doc.as_str()).unwrap();
        })
    });

    group.finish();
}

/// Benchmark flattening every posting of a lexicon through an index cursor.
fn bench_cursor_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_scan");

    for size in [100, 1000] {
        let documents = generate_test_documents(size);
        for table_type in [TableType::Hash, TableType::PatriciaTrie] {
            let db = populated(&documents, table_type);
            let index = db.index("Terms.Articles_content").unwrap();
            group.throughput(Throughput::Elements(index.stats().postings as u64));

            for reuse in [false, true] {
                let id = BenchmarkId::new(format!("{table_type:?}/reuse={reuse}"), size);
                group.bench_with_input(id, &index, |b, index| {
                    b.iter(|| {
                        let terms = db.table("Terms").unwrap();
                        let mut source = terms.open_cursor(TableCursorOptions::new()).unwrap();
                        let options = IndexCursorOptions::new().reuse_posting_object(reuse);
                        index
                            .with_cursor(&mut source, options, |cursor| {
                                let mut total = 0u64;
                                while let Some(posting) = cursor.advance()? {
                                    total += u64::from(posting.term_frequency);
                                }
                                Ok(total)
                            })
                            .unwrap()
                    })
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_tokenization, bench_indexing, bench_cursor_scan);
criterion_main!(benches);
