//! Tokenizer implementations for text analysis.
//!
//! Tokenizers split the text of an indexed column into tokens. Every token
//! carries its 0-based position; the index writer records postings exactly in
//! the order and at the positions a tokenizer reports them.
//!
//! # Available Tokenizers
//!
//! - [`bigram::BigramTokenizer`] - Character bigrams with per-class grouping
//! - [`ngram::NgramTokenizer`] - Character n-gram tokenization
//! - [`whitespace::WhitespaceTokenizer`] - Splits on whitespace characters
//! - [`unicode_word::UnicodeWordTokenizer`] - Uses Unicode word boundaries
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::tokenizer::{Tokenizer, TokenizerKind};
//!
//! let tokenizer = TokenizerKind::BigramSplitSymbolAlpha.build().unwrap();
//! let tokens: Vec<_> = tokenizer
//!     .tokenize("hello")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(tokens, vec!["he", "el", "ll", "lo", "o"]);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::token::TokenStream;
use crate::error::{GlaiveError, Result};

pub mod bigram;
pub mod ngram;
pub mod unicode_word;
pub mod whitespace;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so a tokenizer can be shared by every
/// table that names it.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Tokenize raw bytes, rejecting anything that is not valid UTF-8.
    fn tokenize_bytes(&self, bytes: &[u8]) -> Result<TokenStream> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            GlaiveError::malformed_input(format!(
                "{} tokenizer expects UTF-8 input: {e}",
                self.name()
            ))
        })?;
        self.tokenize(text)
    }

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Named tokenizer selection, used as a table's default tokenizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Bigrams for CJK and other scripts; alphabetic, numeric and symbol runs
    /// stay whole.
    Bigram,
    /// Like [`TokenizerKind::Bigram`] but alphabetic and symbol runs are split
    /// into bigrams as well.
    BigramSplitSymbolAlpha,
    /// Character n-grams of the given size range.
    Ngram { min_gram: usize, max_gram: usize },
    /// Whitespace separated words.
    Whitespace,
    /// Unicode (UAX #29) words.
    UnicodeWord,
}

impl TokenizerKind {
    /// Instantiate the tokenizer.
    pub fn build(&self) -> Result<Arc<dyn Tokenizer>> {
        let tokenizer: Arc<dyn Tokenizer> = match self {
            TokenizerKind::Bigram => Arc::new(bigram::BigramTokenizer::new()),
            TokenizerKind::BigramSplitSymbolAlpha => {
                Arc::new(bigram::BigramTokenizer::split_symbol_alpha())
            }
            TokenizerKind::Ngram { min_gram, max_gram } => {
                Arc::new(ngram::NgramTokenizer::new(*min_gram, *max_gram)?)
            }
            TokenizerKind::Whitespace => Arc::new(whitespace::WhitespaceTokenizer::new()),
            TokenizerKind::UnicodeWord => Arc::new(unicode_word::UnicodeWordTokenizer::new()),
        };
        Ok(tokenizer)
    }
}
