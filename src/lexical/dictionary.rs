//! Key dictionary for keyed tables.
//!
//! Every keyed table stores its keys in a [`TermDictionary`]: records of a
//! lexicon table are terms, records of a data table are documents, and both
//! are addressed the same way. Ids are assigned densely from 1 in order of
//! creation and never change.
//!
//! Enumeration order depends on the table type. Hash tables enumerate in id
//! order; patricia trie tables enumerate in byte-wise key order.

use std::collections::BTreeMap;
use std::iter::FusedIterator;
use std::ops::Bound;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::lexical::TermId;
use crate::lexical::cursor::{CursorState, TermSource};
use crate::schema::{KeyType, TableType};
use crate::storage::{ScopedHandle, SlotKind, Storage};

/// Enumeration direction of a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Natural order of the table.
    #[default]
    Ascending,
    /// Reverse of the natural order.
    Descending,
}

/// Key bounds and prefix restricting a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    min: Bound<String>,
    max: Bound<String>,
    prefix: Option<String>,
}

impl Default for KeyRange {
    fn default() -> Self {
        KeyRange {
            min: Bound::Unbounded,
            max: Bound::Unbounded,
            prefix: None,
        }
    }
}

impl KeyRange {
    /// A range matching every key.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keys `>= key`.
    pub fn at_least<S: Into<String>>(mut self, key: S) -> Self {
        self.min = Bound::Included(key.into());
        self
    }

    /// Keys `> key`.
    pub fn greater_than<S: Into<String>>(mut self, key: S) -> Self {
        self.min = Bound::Excluded(key.into());
        self
    }

    /// Keys `<= key`.
    pub fn at_most<S: Into<String>>(mut self, key: S) -> Self {
        self.max = Bound::Included(key.into());
        self
    }

    /// Keys `< key`.
    pub fn less_than<S: Into<String>>(mut self, key: S) -> Self {
        self.max = Bound::Excluded(key.into());
        self
    }

    /// Keys starting with `prefix`.
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Whether `key` falls inside the range.
    pub fn contains(&self, key: &str) -> bool {
        let above_min = match &self.min {
            Bound::Included(min) => key >= min.as_str(),
            Bound::Excluded(min) => key > min.as_str(),
            Bound::Unbounded => true,
        };
        let below_max = match &self.max {
            Bound::Included(max) => key <= max.as_str(),
            Bound::Excluded(max) => key < max.as_str(),
            Bound::Unbounded => true,
        };
        let prefixed = self.prefix.as_deref().is_none_or(|p| key.starts_with(p));
        above_min && below_max && prefixed
    }
}

/// Options for opening a cursor over a keyed table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorOptions {
    /// Key restriction.
    pub range: KeyRange,
    /// Enumeration direction.
    pub order: Order,
    /// Number of matching keys to skip.
    pub offset: usize,
    /// Maximum number of keys to yield.
    pub limit: Option<usize>,
}

impl CursorOptions {
    /// Options enumerating the whole table in natural order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a key range.
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = range;
        self
    }

    /// Set the direction.
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Skip the first `offset` matches.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Yield at most `limit` keys.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug)]
enum KeyIndex {
    Hash(AHashMap<String, TermId>),
    Trie(BTreeMap<String, TermId>),
}

/// Bidirectional key to id mapping of one table.
#[derive(Debug)]
pub struct TermDictionary {
    name: String,
    table_type: TableType,
    key_type: KeyType,
    slot_kind: SlotKind,
    keys: Vec<String>,
    index: KeyIndex,
    storage: Arc<dyn Storage>,
}

impl TermDictionary {
    /// Create an empty dictionary for table `name`.
    ///
    /// `slot_kind` is the kind of storage slot one key occupies.
    pub fn new<S: Into<String>>(
        name: S,
        table_type: TableType,
        key_type: KeyType,
        slot_kind: SlotKind,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let index = match table_type {
            TableType::Hash => KeyIndex::Hash(AHashMap::new()),
            TableType::PatriciaTrie => KeyIndex::Trie(BTreeMap::new()),
        };
        TermDictionary {
            name: name.into(),
            table_type,
            key_type,
            slot_kind,
            keys: Vec::new(),
            index,
            storage,
        }
    }

    /// Name of the owning table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table type deciding enumeration order.
    pub fn table_type(&self) -> TableType {
        self.table_type
    }

    /// Kind of slot one key occupies.
    pub fn slot_kind(&self) -> SlotKind {
        self.slot_kind
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the dictionary has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Id of `key`, if present.
    pub fn lookup(&self, key: &str) -> Option<TermId> {
        match &self.index {
            KeyIndex::Hash(map) => map.get(key).copied(),
            KeyIndex::Trie(map) => map.get(key).copied(),
        }
    }

    /// Key of `id`, if present.
    pub fn key(&self, id: TermId) -> Option<&str> {
        let slot = usize::try_from(id).ok()?.checked_sub(1)?;
        self.keys.get(slot).map(String::as_str)
    }

    /// Whether `id` names an existing key.
    pub fn contains_id(&self, id: TermId) -> bool {
        self.key(id).is_some()
    }

    /// Id of `key`, creating it when absent.
    ///
    /// Creating a key reserves one slot from storage and fails with
    /// `StorageExhausted` when none is left.
    pub fn resolve_or_create(&mut self, key: &str) -> Result<TermId> {
        if let Some(id) = self.lookup(key) {
            return Ok(id);
        }
        self.key_type.validate(key)?;
        self.storage.reserve(&[(self.slot_kind, 1)])?;
        Ok(self.insert_reserved(key))
    }

    /// Check that `key` could be created.
    pub fn validate_key(&self, key: &str) -> Result<()> {
        self.key_type.validate(key)
    }

    /// Insert a key whose slot has already been reserved.
    ///
    /// Returns the existing id when the key is present.
    pub(crate) fn insert_reserved(&mut self, key: &str) -> TermId {
        if let Some(id) = self.lookup(key) {
            return id;
        }
        self.keys.push(key.to_string());
        let id = self.keys.len() as TermId;
        match &mut self.index {
            KeyIndex::Hash(map) => map.insert(key.to_string(), id),
            KeyIndex::Trie(map) => map.insert(key.to_string(), id),
        };
        id
    }

    /// Ids selected by `options`, in enumeration order.
    pub fn select(&self, options: &CursorOptions) -> Vec<TermId> {
        let matching: Box<dyn DoubleEndedIterator<Item = TermId> + '_> = match &self.index {
            KeyIndex::Hash(_) => Box::new(
                self.keys
                    .iter()
                    .enumerate()
                    .filter(|(_, key)| options.range.contains(key))
                    .map(|(slot, _)| (slot + 1) as TermId),
            ),
            KeyIndex::Trie(map) => Box::new(
                map.iter()
                    .filter(|(key, _)| options.range.contains(key))
                    .map(|(_, id)| *id),
            ),
        };
        let ordered: Box<dyn Iterator<Item = TermId> + '_> = match options.order {
            Order::Ascending => matching,
            Order::Descending => Box::new(matching.rev()),
        };
        ordered
            .skip(options.offset)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Open a cursor over the keys selected by `options`.
    ///
    /// The selection is taken when the cursor opens; the cursor holds a
    /// storage handle until it is closed or dropped.
    pub fn open_cursor(&self, options: &CursorOptions) -> Result<TermCursor<'_>> {
        let handle = ScopedHandle::acquire(self.storage.clone(), &self.name)?;
        let ids = self.select(options);
        debug!("opened cursor over {} with {} key(s)", self.name, ids.len());
        Ok(TermCursor {
            dictionary: self,
            ids,
            pos: 0,
            state: CursorState::BeforeFirst,
            handle,
        })
    }
}

/// A cursor enumerating `(id, key)` pairs of a dictionary.
#[derive(Debug)]
pub struct TermCursor<'a> {
    dictionary: &'a TermDictionary,
    ids: Vec<TermId>,
    pos: usize,
    state: CursorState,
    handle: ScopedHandle,
}

impl<'a> TermCursor<'a> {
    /// The dictionary being enumerated.
    pub fn dictionary(&self) -> &'a TermDictionary {
        self.dictionary
    }

    /// Move to the next key.
    ///
    /// Returns `Ok(None)` once at the end; advancing an exhausted or closed
    /// cursor fails with `InvalidState`.
    pub fn advance(&mut self) -> Result<Option<(TermId, &'a str)>> {
        match self.state {
            CursorState::Closed => {
                return Err(GlaiveError::invalid_state(format!(
                    "cursor over {} is closed",
                    self.dictionary.name
                )));
            }
            CursorState::Exhausted => {
                return Err(GlaiveError::invalid_state(format!(
                    "cursor over {} is exhausted",
                    self.dictionary.name
                )));
            }
            CursorState::BeforeFirst | CursorState::Positioned => {}
        }

        while let Some(&id) = self.ids.get(self.pos) {
            self.pos += 1;
            if let Some(key) = self.dictionary.key(id) {
                self.state = CursorState::Positioned;
                return Ok(Some((id, key)));
            }
        }
        self.state = CursorState::Exhausted;
        Ok(None)
    }

    /// The current `(id, key)` pair.
    pub fn current(&self) -> Result<(TermId, &'a str)> {
        if self.state != CursorState::Positioned {
            return Err(GlaiveError::invalid_state(format!(
                "cursor over {} has no current key ({})",
                self.dictionary.name, self.state
            )));
        }
        let id = self.ids[self.pos - 1];
        let key = self.dictionary.key(id).ok_or_else(|| {
            GlaiveError::not_found(format!("key {id} of {}", self.dictionary.name))
        })?;
        Ok((id, key))
    }

    /// Number of keys not yet yielded.
    pub fn remaining(&self) -> usize {
        self.ids.len().saturating_sub(self.pos)
    }

    /// Lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Whether [`TermCursor::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Release the storage handle. Idempotent and infallible.
    pub fn close(&mut self) {
        if self.state != CursorState::Closed {
            self.handle.release();
            self.state = CursorState::Closed;
        }
    }
}

/// Yields the remaining pairs. A closed or exhausted cursor yields nothing.
impl<'a> Iterator for TermCursor<'a> {
    type Item = (TermId, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::Closed | CursorState::Exhausted => None,
            _ => self.advance().ok().flatten(),
        }
    }
}

impl FusedIterator for TermCursor<'_> {}

/// An exhausted cursor keeps reporting the end; a closed one fails.
impl TermSource for TermCursor<'_> {
    fn next_term_id(&mut self) -> Result<Option<TermId>> {
        if self.state == CursorState::Exhausted {
            return Ok(None);
        }
        Ok(self.advance()?.map(|(id, _)| id))
    }

    fn lexicon_name(&self) -> Option<&str> {
        Some(self.dictionary.name())
    }
}
