//! Inverted index core.
//!
//! - [`dictionary`]: key to id mapping for every keyed table, including
//!   lexicons whose keys are terms
//! - [`posting`]: per-term posting lists and the posting value type
//! - [`writer`]: tokenizes source values and appends postings
//! - [`cursor`]: the index cursor that flattens the posting lists of the
//!   terms an outer cursor yields

pub mod cursor;
pub mod dictionary;
pub mod posting;
pub mod writer;

/// Id of a record in a keyed table. Ids start at 1 and are never reused.
pub type RecordId = u32;

/// Id of a term: the record id of the term in its lexicon table.
pub type TermId = RecordId;

/// 1-based position of a source column in an index definition.
pub type SectionId = u32;
