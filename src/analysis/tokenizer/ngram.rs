//! N-gram tokenizer implementation.

use crate::analysis::token::{Token, TokenStream, TokenType};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{GlaiveError, Result};

/// A tokenizer that generates character n-grams.
///
/// Unlike [`super::bigram::BigramTokenizer`], grams never shrink at the end of
/// the text and whitespace is treated like any other character. Positions are
/// assigned in emission order, so with a size range every gram gets its own
/// position.
///
/// # Examples
///
/// ```
/// use glaive::analysis::tokenizer::ngram::NgramTokenizer;
/// use glaive::analysis::tokenizer::Tokenizer;
///
/// let tokenizer = NgramTokenizer::new(2, 2).unwrap();
/// let tokens: Vec<_> = tokenizer.tokenize("hello").unwrap().map(|t| t.text).collect();
/// assert_eq!(tokens, vec!["he", "el", "ll", "lo"]);
///
/// let tokenizer = NgramTokenizer::new(2, 3).unwrap();
/// let tokens: Vec<_> = tokenizer.tokenize("abc").unwrap().map(|t| t.text).collect();
/// assert_eq!(tokens, vec!["ab", "abc", "bc"]);
/// ```
#[derive(Clone, Debug)]
pub struct NgramTokenizer {
    /// Minimum n-gram size
    min_gram: usize,
    /// Maximum n-gram size
    max_gram: usize,
}

impl NgramTokenizer {
    /// Create a new n-gram tokenizer.
    ///
    /// # Errors
    ///
    /// Returns an analysis error if `min_gram` is 0 or `max_gram` is less
    /// than `min_gram`.
    pub fn new(min_gram: usize, max_gram: usize) -> Result<Self> {
        if min_gram == 0 {
            return Err(GlaiveError::analysis("min_gram must be at least 1"));
        }
        if max_gram < min_gram {
            return Err(GlaiveError::analysis(format!(
                "max_gram ({max_gram}) must be >= min_gram ({min_gram})"
            )));
        }
        Ok(Self { min_gram, max_gram })
    }

    /// Create a bigram tokenizer (n=2).
    pub fn bigram() -> Self {
        Self {
            min_gram: 2,
            max_gram: 2,
        }
    }

    /// Create a trigram tokenizer (n=3).
    pub fn trigram() -> Self {
        Self {
            min_gram: 3,
            max_gram: 3,
        }
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        // Byte offset of every char boundary, including the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let char_count = boundaries.len();
        boundaries.push(text.len());

        let mut tokens = Vec::new();
        for start in 0..char_count {
            for gram_size in self.min_gram..=self.max_gram {
                let end = start + gram_size;
                if end > char_count {
                    break;
                }
                let (start_offset, end_offset) = (boundaries[start], boundaries[end]);
                let gram = &text[start_offset..end_offset];
                let token_type = gram
                    .chars()
                    .next()
                    .map_or(TokenType::Other, TokenType::of_char);
                tokens.push(
                    Token::with_offsets(gram, tokens.len(), start_offset, end_offset)
                        .with_token_type(token_type),
                );
            }
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "ngram"
    }
}
