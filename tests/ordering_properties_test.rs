//! Property tests for posting order and group statistics.

use std::collections::HashMap;

use glaive::analysis::tokenizer::TokenizerKind;
use glaive::database::{Database, TableCursorOptions, Value};
use glaive::lexical::cursor::IndexCursorOptions;
use glaive::lexical::posting::Posting;
use glaive::schema::{IndexDefinition, Schema, TableDefinition};
use proptest::prelude::*;

fn build(records: &[Vec<String>], with_position: bool) -> Database {
    let mut db = Database::in_memory().unwrap();
    db.define(
        &Schema::builder()
            .create_table(TableDefinition::new("Docs").text("body"))
            .create_table(
                TableDefinition::new("Words")
                    .default_tokenizer(TokenizerKind::Whitespace)
                    .index(IndexDefinition::new("Docs.body").with_position(with_position)),
            )
            .build()
            .unwrap(),
    )
    .unwrap();
    for (i, words) in records.iter().enumerate() {
        db.add("Docs", &format!("doc{i}"), [("body", Value::from(words.join(" ")))])
            .unwrap();
    }
    db
}

fn scan(db: &Database) -> Vec<Posting> {
    let index = db.index("Words.Docs_body").unwrap();
    let mut words = db
        .table("Words")
        .unwrap()
        .open_cursor(TableCursorOptions::new())
        .unwrap();
    index
        .with_cursor(&mut words, IndexCursorOptions::new(), |cursor| {
            cursor.collect_all()
        })
        .unwrap()
}

fn records() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..8)
            .prop_map(|words| words.into_iter().map(String::from).collect()),
        1..6,
    )
}

proptest! {
    #[test]
    fn prop_postings_sorted_within_term(records in records(), with_position in any::<bool>()) {
        let postings = scan(&build(&records, with_position));
        for pair in postings.windows(2) {
            if pair[0].term_id == pair[1].term_id {
                let a = (pair[0].record_id, pair[0].section_id, pair[0].position);
                let b = (pair[1].record_id, pair[1].section_id, pair[1].position);
                prop_assert!(a < b, "{a:?} !< {b:?}");
            }
        }
    }

    #[test]
    fn prop_group_statistics(records in records()) {
        let postings = scan(&build(&records, true));

        let mut groups: HashMap<(u32, u32, u32), Vec<&Posting>> = HashMap::new();
        for posting in &postings {
            groups
                .entry((posting.term_id, posting.record_id, posting.section_id))
                .or_default()
                .push(posting);
        }
        for group in groups.values() {
            for (i, posting) in group.iter().enumerate() {
                prop_assert_eq!(posting.term_frequency as usize, group.len());
                prop_assert_eq!(posting.n_rest_postings as usize, group.len() - i - 1);
            }
        }

        let tokens: usize = records.iter().map(Vec::len).sum();
        prop_assert_eq!(postings.len(), tokens);
    }

    #[test]
    fn prop_collapsed_groups_count_occurrences(records in records()) {
        let db = build(&records, false);
        let postings = scan(&db);

        let mut expected: HashMap<(String, u32), u32> = HashMap::new();
        for (i, words) in records.iter().enumerate() {
            for word in words {
                *expected.entry((word.clone(), i as u32 + 1)).or_default() += 1;
            }
        }

        let index = db.index("Words.Docs_body").unwrap();
        prop_assert_eq!(postings.len(), expected.len());
        for posting in &postings {
            let term = posting.term(&index).unwrap().key().to_string();
            prop_assert_eq!(posting.position, 0);
            prop_assert_eq!(posting.n_rest_postings, 0);
            prop_assert_eq!(
                Some(&posting.term_frequency),
                expected.get(&(term, posting.record_id))
            );
        }
    }
}
