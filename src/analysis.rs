//! Text analysis for Glaive.
//!
//! Tokenizers turn the raw text of an indexed column into an ordered stream of
//! [`token::Token`]s. The index writer consumes that stream as
//! `(term, position)` pairs; tokenizers are selected per lexicon table through
//! [`tokenizer::TokenizerKind`].

pub mod token;
pub mod tokenizer;
