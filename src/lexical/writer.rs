//! Index writer.
//!
//! The writer turns one source value of one record into postings. A call is
//! atomic: the value is tokenized and checked, then every term and posting
//! slot it needs is reserved in a single request, and only then are the
//! lexicon and posting lists touched. A malformed value or an exhausted
//! backend leaves the index exactly as it was.

use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::Tokenizer;
use crate::error::{GlaiveError, Result};
use crate::lexical::dictionary::TermDictionary;
use crate::lexical::posting::PostingListStore;
use crate::lexical::{RecordId, SectionId};
use crate::storage::{SlotKind, Storage};

/// What one writer call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Terms added to the lexicon.
    pub terms_created: usize,
    /// Postings appended.
    pub postings_added: usize,
}

/// All occurrences of one term in the value being written.
#[derive(Debug)]
struct TermOccurrences {
    key: String,
    /// `(position, weight)` in position order.
    occurrences: Vec<(u32, u32)>,
}

/// Writes postings of one index column.
#[derive(Debug)]
pub struct IndexWriter<'a> {
    lexicon: &'a mut TermDictionary,
    postings: &'a mut PostingListStore,
    storage: &'a dyn Storage,
    tokenizer: Option<&'a dyn Tokenizer>,
    with_position: bool,
    with_weight: bool,
}

impl<'a> IndexWriter<'a> {
    /// Create a writer appending to `postings` with terms from `lexicon`.
    ///
    /// Without a tokenizer every value (or vector element) is one term.
    pub fn new(
        lexicon: &'a mut TermDictionary,
        postings: &'a mut PostingListStore,
        storage: &'a dyn Storage,
    ) -> Self {
        IndexWriter {
            lexicon,
            postings,
            storage,
            tokenizer: None,
            with_position: true,
            with_weight: false,
        }
    }

    /// Split values with `tokenizer`.
    pub fn tokenizer(mut self, tokenizer: Option<&'a dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Record one posting per occurrence (`true`) or one per record and
    /// section at position 0 (`false`).
    pub fn with_position(mut self, with_position: bool) -> Self {
        self.with_position = with_position;
        self
    }

    /// Copy element weights into postings.
    pub fn with_weight(mut self, with_weight: bool) -> Self {
        self.with_weight = with_weight;
        self
    }

    /// Index a text value.
    pub fn index(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        text: &str,
    ) -> Result<IndexStats> {
        self.index_elements(record_id, section_id, &[(text, 0)])
    }

    /// Index a raw value that must be UTF-8.
    pub fn index_bytes(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        bytes: &[u8],
    ) -> Result<IndexStats> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            GlaiveError::malformed_input(format!(
                "value of record {record_id} section {section_id} is not UTF-8: {e}"
            ))
        })?;
        self.index(record_id, section_id, text)
    }

    /// Index a vector value given as `(element, weight)` pairs.
    ///
    /// Positions continue across elements, so the first token of an element
    /// follows the last token of the previous one.
    pub fn index_elements(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        elements: &[(&str, u32)],
    ) -> Result<IndexStats> {
        check_ids(record_id, section_id)?;
        let terms = self.analyze(elements)?;
        if terms.is_empty() {
            return Ok(IndexStats::default());
        }

        let mut terms_created = 0;
        let mut postings_added = 0;
        for term in &terms {
            match self.lexicon.lookup(&term.key) {
                Some(term_id) => {
                    if self.postings.has_group(term_id, record_id, section_id) {
                        return Err(GlaiveError::index(format!(
                            "{}: record {record_id} section {section_id} is already indexed for '{}'",
                            self.postings.name(),
                            term.key
                        )));
                    }
                }
                None => {
                    self.lexicon.validate_key(&term.key)?;
                    terms_created += 1;
                }
            }
            postings_added += self.posting_count(term);
        }

        self.storage.reserve(&[
            (self.lexicon.slot_kind(), terms_created),
            (SlotKind::Posting, postings_added),
        ])?;

        for term in &terms {
            let term_id = self.lexicon.insert_reserved(&term.key);
            if self.with_position {
                self.postings.insert_group_reserved(
                    term_id,
                    record_id,
                    section_id,
                    &term.occurrences,
                    None,
                )?;
            } else {
                let weight = term.occurrences.first().map_or(0, |&(_, weight)| weight);
                self.postings.insert_group_reserved(
                    term_id,
                    record_id,
                    section_id,
                    &[(0, weight)],
                    Some(term.occurrences.len() as u32),
                )?;
            }
        }

        debug!(
            "{}: indexed record {record_id} section {section_id}: {postings_added} posting(s), {terms_created} new term(s)",
            self.postings.name()
        );
        Ok(IndexStats {
            terms_created,
            postings_added,
        })
    }

    /// Remove the postings a previously indexed text value produced.
    pub fn unindex(&mut self, record_id: RecordId, section_id: SectionId, text: &str) -> Result<usize> {
        self.unindex_elements(record_id, section_id, &[(text, 0)])
    }

    /// Remove the postings a previously indexed vector value produced.
    ///
    /// Terms stay in the lexicon. Returns the number of postings removed.
    pub fn unindex_elements(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        elements: &[(&str, u32)],
    ) -> Result<usize> {
        check_ids(record_id, section_id)?;
        let terms = self.analyze(elements)?;
        let mut removed = 0;
        for term in &terms {
            if let Some(term_id) = self.lexicon.lookup(&term.key) {
                removed += self.postings.remove_group(term_id, record_id, section_id);
            }
        }
        debug!(
            "{}: unindexed record {record_id} section {section_id}: {removed} posting(s)",
            self.postings.name()
        );
        Ok(removed)
    }

    fn posting_count(&self, term: &TermOccurrences) -> usize {
        if self.with_position {
            term.occurrences.len()
        } else {
            1
        }
    }

    /// Tokenize every element and group the occurrences by term, in order of
    /// first occurrence.
    fn analyze(&self, elements: &[(&str, u32)]) -> Result<Vec<TermOccurrences>> {
        let mut terms: Vec<TermOccurrences> = Vec::new();
        let mut slots: AHashMap<String, usize> = AHashMap::new();
        let mut add = |key: &str, position: u32, weight: u32| {
            let slot = *slots.entry(key.to_string()).or_insert_with(|| {
                terms.push(TermOccurrences {
                    key: key.to_string(),
                    occurrences: Vec::new(),
                });
                terms.len() - 1
            });
            terms[slot].occurrences.push((position, weight));
        };

        let mut base: u32 = 0;
        for &(text, weight) in elements {
            let weight = if self.with_weight { weight } else { 0 };
            let Some(tokenizer) = self.tokenizer else {
                if !text.is_empty() {
                    add(text, base, weight);
                }
                base += 1;
                continue;
            };

            let mut next_base = base;
            for token in tokenizer.tokenize(text)? {
                let position = u32::try_from(token.position)
                    .ok()
                    .and_then(|p| base.checked_add(p))
                    .ok_or_else(|| {
                        GlaiveError::analysis(format!(
                            "token position {} is out of range",
                            token.position
                        ))
                    })?;
                add(&token.text, position, weight);
                next_base = next_base.max(position + 1);
            }
            base = next_base;
        }
        Ok(terms)
    }
}

fn check_ids(record_id: RecordId, section_id: SectionId) -> Result<()> {
    if record_id == 0 || section_id == 0 {
        return Err(GlaiveError::invalid_argument(format!(
            "record id and section id start at 1, got record {record_id} section {section_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::tokenizer::TokenizerKind;
    use crate::error::ErrorKind;
    use crate::schema::{KeyType, TableType};
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn fixture(config: MemoryStorageConfig) -> (Arc<MemoryStorage>, TermDictionary, PostingListStore) {
        let storage = Arc::new(MemoryStorage::new(config));
        let lexicon = TermDictionary::new(
            "Terms",
            TableType::Hash,
            KeyType::ShortText,
            SlotKind::Term,
            storage.clone(),
        );
        let postings = PostingListStore::new("Terms.Articles_content", storage.clone());
        (storage, lexicon, postings)
    }

    fn entries(postings: &PostingListStore, term_id: u32) -> Vec<(u32, u32, u32, u32)> {
        postings
            .postings(term_id)
            .map(|p| (p.record_id, p.position, p.term_frequency, p.weight))
            .collect()
    }

    #[test]
    fn test_bigram_positions() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let tokenizer = TokenizerKind::BigramSplitSymbolAlpha.build().unwrap();
        let mut writer = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .tokenizer(Some(tokenizer.as_ref()));

        let stats = writer.index(3, 1, "hello").unwrap();
        assert_eq!(stats.terms_created, 5);
        assert_eq!(stats.postings_added, 5);

        assert_eq!(lexicon.lookup("he"), Some(1));
        assert_eq!(lexicon.lookup("o"), Some(5));
        assert_eq!(entries(&postings, 3), vec![(3, 2, 1, 0)]);
    }

    #[test]
    fn test_repeated_terms_share_frequency() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let tokenizer = TokenizerKind::Whitespace.build().unwrap();
        IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .tokenizer(Some(tokenizer.as_ref()))
            .index(1, 1, "to be or not to be")
            .unwrap();

        let to = lexicon.lookup("to").unwrap();
        assert_eq!(entries(&postings, to), vec![(1, 0, 2, 0), (1, 4, 2, 0)]);
        assert_eq!(storage.stats().posting_slots, 6);
        assert_eq!(storage.stats().term_slots, 4);
    }

    #[test]
    fn test_without_positions_collapses_groups() {
        let (_, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let tokenizer = TokenizerKind::Whitespace.build().unwrap();
        let storage = MemoryStorage::new_default();
        let stats = IndexWriter::new(&mut lexicon, &mut postings, &storage)
            .tokenizer(Some(tokenizer.as_ref()))
            .with_position(false)
            .index(1, 1, "a b a a")
            .unwrap();

        assert_eq!(stats.postings_added, 2);
        let a = lexicon.lookup("a").unwrap();
        assert_eq!(entries(&postings, a), vec![(1, 0, 3, 0)]);
    }

    #[test]
    fn test_elements_without_tokenizer() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .with_weight(true)
            .index_elements(2, 1, &[("rust", 10), ("search", 3), ("rust", 1)])
            .unwrap();

        let rust = lexicon.lookup("rust").unwrap();
        assert_eq!(entries(&postings, rust), vec![(2, 0, 2, 10), (2, 2, 2, 1)]);
        let search = lexicon.lookup("search").unwrap();
        assert_eq!(entries(&postings, search), vec![(2, 1, 1, 3)]);
    }

    #[test]
    fn test_weights_ignored_unless_enabled() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .index_elements(1, 1, &[("tag", 7)])
            .unwrap();
        assert_eq!(entries(&postings, 1), vec![(1, 0, 1, 0)]);
    }

    #[test]
    fn test_malformed_bytes_change_nothing() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let err = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .index_bytes(1, 1, &[0x66, 0xff, 0x6f])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(lexicon.is_empty());
        assert!(postings.is_empty());
        assert_eq!(storage.stats().posting_slots, 0);
    }

    #[test]
    fn test_exhausted_storage_changes_nothing() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig {
            max_posting_slots: Some(3),
            ..Default::default()
        });
        let tokenizer = TokenizerKind::BigramSplitSymbolAlpha.build().unwrap();
        let err = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .tokenizer(Some(tokenizer.as_ref()))
            .index(1, 1, "hello")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageExhausted);
        assert!(lexicon.is_empty());
        assert!(postings.is_empty());
        assert_eq!(storage.stats().term_slots, 0);
    }

    #[test]
    fn test_double_index_rejected_and_unindex() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let tokenizer = TokenizerKind::BigramSplitSymbolAlpha.build().unwrap();
        let mut writer = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref())
            .tokenizer(Some(tokenizer.as_ref()));

        writer.index(1, 1, "ll").unwrap();
        assert_eq!(writer.index(1, 1, "l").unwrap_err().kind(), ErrorKind::Index);
        assert_eq!(writer.unindex(1, 1, "ll").unwrap(), 2);
        writer.index(1, 1, "l").unwrap();

        assert_eq!(lexicon.len(), 2);
        assert_eq!(postings.len(), 1);
        assert_eq!(storage.stats().posting_slots, 1);
    }

    #[test]
    fn test_zero_ids_rejected() {
        let (storage, mut lexicon, mut postings) = fixture(MemoryStorageConfig::default());
        let mut writer = IndexWriter::new(&mut lexicon, &mut postings, storage.as_ref());
        assert_eq!(
            writer.index(0, 1, "x").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            writer.index(1, 0, "x").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}
