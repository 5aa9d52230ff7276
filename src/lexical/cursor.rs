//! Index cursor.
//!
//! An [`IndexCursor`] walks the posting lists of the terms an outer
//! [`TermSource`] yields, one term at a time, and reports every posting as a
//! flat stream. Terms come in the order of the outer source; postings of one
//! term come in posting list order.
//!
//! ```
//! use glaive::analysis::tokenizer::TokenizerKind;
//! use glaive::database::{Database, TableCursorOptions, Value};
//! use glaive::lexical::cursor::IndexCursorOptions;
//! use glaive::schema::{IndexDefinition, Schema, TableDefinition};
//!
//! # fn main() -> glaive::error::Result<()> {
//! let mut db = Database::in_memory()?;
//! db.define(
//!     &Schema::builder()
//!         .create_table(TableDefinition::new("Articles").text("content"))
//!         .create_table(
//!             TableDefinition::new("Terms")
//!                 .default_tokenizer(TokenizerKind::BigramSplitSymbolAlpha)
//!                 .index(IndexDefinition::new("Articles.content")),
//!         )
//!         .build()?,
//! )?;
//! db.add("Articles", "1", [("content", Value::from("hello"))])?;
//!
//! let index = db.index("Terms.Articles_content")?;
//! let mut terms = db.table("Terms")?.open_cursor(TableCursorOptions::new())?;
//! let postings = index.with_cursor(&mut terms, IndexCursorOptions::new(), |cursor| {
//!     cursor.collect_all()
//! })?;
//! assert_eq!(postings.len(), 5);
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::iter::FusedIterator;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::database::{IndexRef, Record};
use crate::error::{GlaiveError, Result};
use crate::lexical::TermId;
use crate::lexical::posting::{Posting, PostingIter};
use crate::storage::ScopedHandle;

/// Lifecycle of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorState {
    /// Open, not yet advanced.
    BeforeFirst,
    /// Open with a current item.
    Positioned,
    /// Open; the end has been reported.
    Exhausted,
    /// Closed; every positional operation fails. `close` and the status
    /// queries still succeed.
    Closed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorState::BeforeFirst => write!(f, "before first"),
            CursorState::Positioned => write!(f, "positioned"),
            CursorState::Exhausted => write!(f, "exhausted"),
            CursorState::Closed => write!(f, "closed"),
        }
    }
}

/// A stream of term ids driving an [`IndexCursor`].
pub trait TermSource {
    /// The next term id, or `None` at the end.
    fn next_term_id(&mut self) -> Result<Option<TermId>>;

    /// Name of the lexicon table the ids belong to, when known.
    fn lexicon_name(&self) -> Option<&str> {
        None
    }
}

impl<T: TermSource + ?Sized> TermSource for &mut T {
    fn next_term_id(&mut self) -> Result<Option<TermId>> {
        (**self).next_term_id()
    }

    fn lexicon_name(&self) -> Option<&str> {
        (**self).lexicon_name()
    }
}

/// A fixed list of term ids.
#[derive(Debug, Clone, Default)]
pub struct TermIdList {
    ids: Vec<TermId>,
    pos: usize,
    lexicon: Option<String>,
}

impl TermIdList {
    /// Yield `ids` in the given order.
    pub fn new<I: IntoIterator<Item = TermId>>(ids: I) -> Self {
        TermIdList {
            ids: ids.into_iter().collect(),
            pos: 0,
            lexicon: None,
        }
    }

    /// Yield `ids` of the lexicon table `name`.
    pub fn for_lexicon<S: Into<String>, I: IntoIterator<Item = TermId>>(name: S, ids: I) -> Self {
        TermIdList {
            lexicon: Some(name.into()),
            ..Self::new(ids)
        }
    }

    /// The ids, including those already yielded.
    pub fn ids(&self) -> &[TermId] {
        &self.ids
    }
}

impl From<Vec<TermId>> for TermIdList {
    fn from(ids: Vec<TermId>) -> Self {
        Self::new(ids)
    }
}

impl TermSource for TermIdList {
    fn next_term_id(&mut self) -> Result<Option<TermId>> {
        let id = self.ids.get(self.pos).copied();
        if id.is_some() {
            self.pos += 1;
        }
        Ok(id)
    }

    fn lexicon_name(&self) -> Option<&str> {
        self.lexicon.as_deref()
    }
}

/// Whether each step hands out a fresh posting or refills one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingMode {
    /// Every step yields an independent value.
    #[default]
    FreshPerStep,
    /// Every step yields a borrow of the same slot, overwritten in place.
    Reused,
}

/// Options for [`IndexCursor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexCursorOptions {
    /// How postings are handed out by [`IndexCursor::advance`].
    pub posting_mode: PostingMode,
}

impl IndexCursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refill one posting slot in place on every step.
    pub fn reuse_posting_object(mut self, reuse: bool) -> Self {
        self.posting_mode = if reuse {
            PostingMode::Reused
        } else {
            PostingMode::FreshPerStep
        };
        self
    }
}

/// Cursor over the postings of an index column for the terms of a source.
///
/// The cursor holds a storage handle from the moment it opens until
/// [`IndexCursor::close`] or drop.
pub struct IndexCursor<'db, S: TermSource> {
    index: IndexRef<'db>,
    source: S,
    options: IndexCursorOptions,
    postings: Option<PostingIter<'db>>,
    slot: Option<Posting>,
    state: CursorState,
    closed_reported: bool,
    handle: ScopedHandle,
}

impl<S: TermSource> fmt::Debug for IndexCursor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexCursor")
            .field("index", &self.index.full_name())
            .field("options", &self.options)
            .field("state", &self.state)
            .field("current", &self.slot)
            .finish()
    }
}

impl<'db, S: TermSource> IndexCursor<'db, S> {
    pub(crate) fn open(index: IndexRef<'db>, source: S, options: IndexCursorOptions) -> Result<Self> {
        if let Some(lexicon) = source.lexicon_name() {
            if lexicon != index.lexicon_name() {
                return Err(GlaiveError::invalid_argument(format!(
                    "terms of '{lexicon}' cannot drive index '{}'",
                    index.full_name()
                )));
            }
        }
        let handle = ScopedHandle::acquire(index.storage(), &index.full_name())?;
        debug!(
            "opened index cursor on {} ({:?})",
            index.full_name(),
            options.posting_mode
        );

        Ok(IndexCursor {
            index,
            source,
            options,
            postings: None,
            slot: None,
            state: CursorState::BeforeFirst,
            closed_reported: false,
            handle,
        })
    }

    /// The index column being read. A status query; it also succeeds after
    /// close.
    pub fn index(&self) -> IndexRef<'db> {
        self.index
    }

    /// Options the cursor was opened with. A status query; it also succeeds
    /// after close.
    pub fn options(&self) -> &IndexCursorOptions {
        &self.options
    }

    /// Lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Whether [`IndexCursor::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            CursorState::Closed => Err(GlaiveError::invalid_state(format!(
                "index cursor on {} is closed",
                self.index.full_name()
            ))),
            CursorState::Exhausted => Err(GlaiveError::invalid_state(format!(
                "index cursor on {} is exhausted",
                self.index.full_name()
            ))),
            CursorState::BeforeFirst | CursorState::Positioned => Ok(()),
        }
    }

    /// Pull the next posting, moving to the next term when a list runs out.
    fn pull(&mut self) -> Result<Option<Posting>> {
        self.ensure_open()?;
        loop {
            if let Some(posting) = self.postings.as_mut().and_then(Iterator::next) {
                return Ok(Some(posting));
            }
            match self.source.next_term_id() {
                Ok(Some(term_id)) => {
                    self.postings = Some(self.index.postings().postings(term_id));
                }
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => {
                    self.finish();
                    return Err(e);
                }
            }
        }
    }

    /// End the traversal. A failing source ends it too, so the cursor
    /// never asks the source again.
    fn finish(&mut self) {
        self.postings = None;
        self.slot = None;
        self.state = CursorState::Exhausted;
    }

    /// Move to the next posting.
    ///
    /// Under [`PostingMode::Reused`] the result borrows the cursor's single
    /// slot, which the next step overwrites; under
    /// [`PostingMode::FreshPerStep`] it is an owned value. Returns `Ok(None)`
    /// once at the end; after that, and after close, this fails with
    /// `InvalidState`.
    pub fn advance(&mut self) -> Result<Option<Cow<'_, Posting>>> {
        let Some(posting) = self.pull()? else {
            return Ok(None);
        };
        self.state = CursorState::Positioned;
        let slot = self.slot.insert(posting);
        Ok(Some(match self.options.posting_mode {
            PostingMode::Reused => Cow::Borrowed(&*slot),
            PostingMode::FreshPerStep => Cow::Owned(*slot),
        }))
    }

    /// Move to the next posting and return a copy of it, whatever the mode.
    pub fn next_posting(&mut self) -> Result<Option<Posting>> {
        Ok(self.advance()?.map(Cow::into_owned))
    }

    /// The current posting.
    pub fn current(&self) -> Result<&Posting> {
        if self.state != CursorState::Positioned {
            return Err(GlaiveError::invalid_state(format!(
                "index cursor on {} has no current posting ({})",
                self.index.full_name(),
                self.state
            )));
        }
        self.slot.as_ref().ok_or_else(|| {
            GlaiveError::invalid_state(format!(
                "index cursor on {} has no current posting",
                self.index.full_name()
            ))
        })
    }

    /// Source record of the current posting.
    pub fn record(&self) -> Result<Record<'db>> {
        let record_id = self.current()?.record_id;
        self.index.record(record_id)
    }

    /// Lexicon record of the current posting's term.
    pub fn term(&self) -> Result<Record<'db>> {
        let term_id = self.current()?.term_id;
        self.index.term(term_id)
    }

    /// Call `f` for every remaining posting, honoring the posting mode.
    pub fn each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&Posting) -> Result<()>,
    {
        while let Some(posting) = self.advance()? {
            f(&posting)?;
        }
        Ok(())
    }

    /// All remaining postings as independent values.
    pub fn collect_all(&mut self) -> Result<Vec<Posting>> {
        let mut postings = Vec::new();
        while let Some(posting) = self.next_posting()? {
            postings.push(posting);
        }
        Ok(postings)
    }

    /// Release the storage handle. Idempotent and infallible.
    ///
    /// The outer term source stays open; it belongs to the caller.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.handle.release();
        self.postings = None;
        self.slot = None;
        self.state = CursorState::Closed;
        debug!("closed index cursor on {}", self.index.full_name());
    }
}

/// Yields owned postings. A closed cursor yields one `InvalidState` error;
/// a failing source yields its error once and ends the sequence.
impl<S: TermSource> Iterator for IndexCursor<'_, S> {
    type Item = Result<Posting>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::Exhausted => None,
            CursorState::Closed if self.closed_reported => None,
            CursorState::Closed => {
                self.closed_reported = true;
                Some(Err(GlaiveError::invalid_state(format!(
                    "index cursor on {} is closed",
                    self.index.full_name()
                ))))
            }
            CursorState::BeforeFirst | CursorState::Positioned => self.next_posting().transpose(),
        }
    }
}

impl<S: TermSource> FusedIterator for IndexCursor<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_id_list() {
        let mut list = TermIdList::new([3, 1]);
        assert_eq!(list.next_term_id().unwrap(), Some(3));
        assert_eq!(list.next_term_id().unwrap(), Some(1));
        assert_eq!(list.next_term_id().unwrap(), None);
        assert_eq!(list.next_term_id().unwrap(), None);
        assert_eq!(list.lexicon_name(), None);

        let list = TermIdList::for_lexicon("Terms", vec![1]);
        assert_eq!(list.lexicon_name(), Some("Terms"));
    }

    fn first<S: TermSource>(mut source: S) -> Option<TermId> {
        source.next_term_id().unwrap()
    }

    #[test]
    fn test_borrowed_source() {
        let mut list = TermIdList::new([5, 6]);
        assert_eq!(first(&mut list), Some(5));
        assert_eq!(first(&mut list), Some(6));
        assert_eq!(first(&mut list), None);
    }

    #[test]
    fn test_options() {
        assert_eq!(
            IndexCursorOptions::new().posting_mode,
            PostingMode::FreshPerStep
        );
        assert_eq!(
            IndexCursorOptions::new()
                .reuse_posting_object(true)
                .posting_mode,
            PostingMode::Reused
        );

        let options: IndexCursorOptions =
            serde_json::from_str(r#"{"posting_mode":"reused"}"#).unwrap();
        assert_eq!(options.posting_mode, PostingMode::Reused);
    }
}
