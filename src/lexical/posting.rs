//! Posting lists.
//!
//! An index column keeps one [`PostingList`] per term. Entries are ordered by
//! `(record_id, section_id, position)`. The entries of one term that share a
//! record and section form a *group*; every entry of a group carries the
//! group's term frequency.

use std::ops::Range;
use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::lexical::{RecordId, SectionId, TermId};
use crate::storage::{SlotKind, Storage};

/// One posting as reported by an index cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Posting {
    /// Id of the source record.
    pub record_id: RecordId,
    /// 1-based source column the occurrence came from.
    pub section_id: SectionId,
    /// Id of the term in the lexicon.
    pub term_id: TermId,
    /// 0-based token position within the section.
    pub position: u32,
    /// Occurrences of the term in this record and section.
    pub term_frequency: u32,
    /// Weight of the occurrence; 0 unless the index stores weights.
    pub weight: u32,
    /// Postings of the same record, section and term after this one.
    pub n_rest_postings: u32,
}

impl Posting {
    /// The posting as a JSON object keyed by field name.
    pub fn to_hash(&self) -> serde_json::Value {
        serde_json::json!({
            "record_id": self.record_id,
            "section_id": self.section_id,
            "term_id": self.term_id,
            "position": self.position,
            "term_frequency": self.term_frequency,
            "weight": self.weight,
            "n_rest_postings": self.n_rest_postings,
        })
    }
}

/// A stored posting. The term id is implied by the owning list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingEntry {
    pub record_id: RecordId,
    pub section_id: SectionId,
    pub position: u32,
    pub weight: u32,
    pub term_frequency: u32,
}

impl PostingEntry {
    fn key(&self) -> (RecordId, SectionId, u32) {
        (self.record_id, self.section_id, self.position)
    }

    fn group(&self) -> (RecordId, SectionId) {
        (self.record_id, self.section_id)
    }
}

/// The ordered postings of one term.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    entries: Vec<PostingEntry>,
}

impl PostingList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of postings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in order.
    pub fn entries(&self) -> &[PostingEntry] {
        &self.entries
    }

    /// Number of distinct `(record, section)` groups.
    pub fn group_count(&self) -> usize {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, e)| *i == 0 || self.entries[i - 1].group() != e.group())
            .count()
    }

    /// Whether an occurrence at `(record_id, section_id, position)` would
    /// extend the list without reordering it.
    pub fn can_append(&self, record_id: RecordId, section_id: SectionId, position: u32) -> bool {
        self.entries
            .last()
            .is_none_or(|last| last.key() < (record_id, section_id, position))
    }

    /// Append one occurrence.
    ///
    /// The key must sort strictly after the last entry. Extending the last
    /// group raises the term frequency of every entry in it.
    pub fn append(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        position: u32,
        weight: u32,
    ) -> Result<()> {
        if !self.can_append(record_id, section_id, position) {
            return Err(GlaiveError::index(format!(
                "posting ({record_id}, {section_id}, {position}) does not sort after the last posting"
            )));
        }

        let group = self.group_range(record_id, section_id);
        let term_frequency = group.len() as u32 + 1;
        for entry in &mut self.entries[group] {
            entry.term_frequency = term_frequency;
        }
        self.entries.push(PostingEntry {
            record_id,
            section_id,
            position,
            weight,
            term_frequency,
        });
        Ok(())
    }

    /// Index range of the `(record_id, section_id)` group. Empty when absent.
    pub fn group_range(&self, record_id: RecordId, section_id: SectionId) -> Range<usize> {
        let group = (record_id, section_id);
        let start = self.entries.partition_point(|e| e.group() < group);
        let end = start + self.entries[start..].partition_point(|e| e.group() == group);
        start..end
    }

    /// Whether the list has postings for `(record_id, section_id)`.
    pub fn has_group(&self, record_id: RecordId, section_id: SectionId) -> bool {
        !self.group_range(record_id, section_id).is_empty()
    }

    /// Remove the `(record_id, section_id)` group, returning how many
    /// postings were removed.
    pub fn remove_group(&mut self, record_id: RecordId, section_id: SectionId) -> usize {
        let range = self.group_range(record_id, section_id);
        let removed = range.len();
        self.entries.drain(range);
        removed
    }

    /// Insert a whole group at its sorted place.
    ///
    /// `occurrences` are `(position, weight)` pairs with strictly increasing
    /// positions. When `term_frequency` is `None` it is the number of
    /// occurrences.
    pub fn insert_group(
        &mut self,
        record_id: RecordId,
        section_id: SectionId,
        occurrences: &[(u32, u32)],
        term_frequency: Option<u32>,
    ) -> Result<()> {
        if occurrences.is_empty() {
            return Ok(());
        }
        if occurrences.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(GlaiveError::index(format!(
                "positions of record {record_id} section {section_id} are not strictly increasing"
            )));
        }
        let range = self.group_range(record_id, section_id);
        if !range.is_empty() {
            return Err(GlaiveError::index(format!(
                "record {record_id} section {section_id} is already indexed"
            )));
        }

        let term_frequency = term_frequency.unwrap_or(occurrences.len() as u32);
        let entries = occurrences.iter().map(|&(position, weight)| PostingEntry {
            record_id,
            section_id,
            position,
            weight,
            term_frequency,
        });
        self.entries.splice(range.start..range.start, entries);
        Ok(())
    }

    /// Iterate the postings of `term_id` in list order.
    pub fn postings(&self, term_id: TermId) -> PostingIter<'_> {
        PostingIter {
            term_id,
            entries: &self.entries,
            pos: 0,
            group_end: 0,
        }
    }
}

/// Forward scan over one posting list.
#[derive(Debug, Clone)]
pub struct PostingIter<'a> {
    term_id: TermId,
    entries: &'a [PostingEntry],
    pos: usize,
    group_end: usize,
}

impl PostingIter<'_> {
    /// An iterator yielding nothing.
    pub fn empty(term_id: TermId) -> Self {
        PostingIter {
            term_id,
            entries: &[],
            pos: 0,
            group_end: 0,
        }
    }

    /// Term whose postings are scanned.
    pub fn term_id(&self) -> TermId {
        self.term_id
    }
}

impl Iterator for PostingIter<'_> {
    type Item = Posting;

    fn next(&mut self) -> Option<Posting> {
        let entry = self.entries.get(self.pos)?;
        if self.pos >= self.group_end {
            let group = entry.group();
            self.group_end = self.pos
                + self.entries[self.pos..].partition_point(|e| e.group() == group);
        }
        let n_rest_postings = (self.group_end - self.pos - 1) as u32;
        self.pos += 1;

        Some(Posting {
            record_id: entry.record_id,
            section_id: entry.section_id,
            term_id: self.term_id,
            position: entry.position,
            term_frequency: entry.term_frequency,
            weight: entry.weight,
            n_rest_postings,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PostingIter<'_> {}

/// Statistics of a posting list store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingStats {
    /// Terms with at least one posting.
    pub terms: usize,
    /// Total postings.
    pub postings: usize,
    /// Total `(term, record, section)` groups.
    pub groups: usize,
}

/// The posting lists of one index column, addressed by term id.
#[derive(Debug)]
pub struct PostingListStore {
    name: String,
    lists: Vec<PostingList>,
    total: usize,
    storage: Arc<dyn Storage>,
}

impl PostingListStore {
    /// Create an empty store for index column `name`.
    pub fn new<S: Into<String>>(name: S, storage: Arc<dyn Storage>) -> Self {
        PostingListStore {
            name: name.into(),
            lists: Vec::new(),
            total: 0,
            storage,
        }
    }

    /// Name of the owning index column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of postings.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The list of `term_id`, if it was ever written.
    pub fn list(&self, term_id: TermId) -> Option<&PostingList> {
        let slot = usize::try_from(term_id).ok()?.checked_sub(1)?;
        self.lists.get(slot)
    }

    fn list_mut(&mut self, term_id: TermId) -> Result<&mut PostingList> {
        let slot = usize::try_from(term_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .ok_or_else(|| GlaiveError::invalid_argument(format!("invalid term id {term_id}")))?;
        if self.lists.len() <= slot {
            self.lists.resize_with(slot + 1, PostingList::new);
        }
        Ok(&mut self.lists[slot])
    }

    /// Postings of `term_id` in list order. Unknown terms have none.
    pub fn postings(&self, term_id: TermId) -> PostingIter<'_> {
        match self.list(term_id) {
            Some(list) => list.postings(term_id),
            None => PostingIter::empty(term_id),
        }
    }

    /// Append one posting for `term_id`, reserving its storage slot.
    pub fn append(
        &mut self,
        term_id: TermId,
        record_id: RecordId,
        section_id: SectionId,
        position: u32,
        weight: u32,
    ) -> Result<()> {
        if let Some(list) = self.list(term_id) {
            if !list.can_append(record_id, section_id, position) {
                return Err(GlaiveError::index(format!(
                    "{}: posting ({record_id}, {section_id}, {position}) of term {term_id} is out of order",
                    self.name
                )));
            }
        }
        self.storage.reserve(&[(SlotKind::Posting, 1)])?;
        match self
            .list_mut(term_id)
            .and_then(|list| list.append(record_id, section_id, position, weight))
        {
            Ok(()) => {
                self.total += 1;
                Ok(())
            }
            Err(e) => {
                self.storage.release(SlotKind::Posting, 1);
                Err(e)
            }
        }
    }

    /// Whether `term_id` already has postings for `(record_id, section_id)`.
    pub fn has_group(&self, term_id: TermId, record_id: RecordId, section_id: SectionId) -> bool {
        self.list(term_id)
            .is_some_and(|list| list.has_group(record_id, section_id))
    }

    /// Insert a group whose posting slots have already been reserved.
    pub(crate) fn insert_group_reserved(
        &mut self,
        term_id: TermId,
        record_id: RecordId,
        section_id: SectionId,
        occurrences: &[(u32, u32)],
        term_frequency: Option<u32>,
    ) -> Result<()> {
        self.list_mut(term_id)?
            .insert_group(record_id, section_id, occurrences, term_frequency)?;
        self.total += occurrences.len();
        Ok(())
    }

    /// Remove the postings of `term_id` for `(record_id, section_id)` and
    /// give their slots back.
    pub fn remove_group(
        &mut self,
        term_id: TermId,
        record_id: RecordId,
        section_id: SectionId,
    ) -> usize {
        let slot = usize::try_from(term_id).ok().and_then(|id| id.checked_sub(1));
        let Some(list) = slot.and_then(|slot| self.lists.get_mut(slot)) else {
            return 0;
        };
        let removed = list.remove_group(record_id, section_id);
        if removed > 0 {
            self.total -= removed;
            self.storage.release(SlotKind::Posting, removed);
            trace!(
                "{}: removed {removed} posting(s) of term {term_id} for record {record_id} section {section_id}",
                self.name
            );
        }
        removed
    }

    /// Store statistics.
    pub fn stats(&self) -> PostingStats {
        PostingStats {
            terms: self.lists.iter().filter(|l| !l.is_empty()).count(),
            postings: self.total,
            groups: self.lists.iter().map(PostingList::group_count).sum(),
        }
    }
}
