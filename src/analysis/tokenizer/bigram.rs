//! Bigram tokenizer implementation.

use crate::analysis::token::{Token, TokenStream, TokenType};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A tokenizer that emits overlapping character bigrams.
///
/// Characters are classified with [`TokenType::of_char`]. Classes that are
/// *grouped* emit each maximal run as one token; every other character starts
/// a bigram with its successor. When the successor is missing, whitespace or
/// a grouped character, the character is emitted alone, so the last
/// character of a run always yields a one-character token.
///
/// # Examples
///
/// ```
/// use glaive::analysis::tokenizer::bigram::BigramTokenizer;
/// use glaive::analysis::tokenizer::Tokenizer;
///
/// let tokenizer = BigramTokenizer::split_symbol_alpha();
/// let tokens: Vec<_> = tokenizer.tokenize("ll").unwrap().map(|t| t.text).collect();
/// assert_eq!(tokens, vec!["ll", "l"]);
///
/// // The plain bigram tokenizer keeps alphabetic words whole.
/// let tokenizer = BigramTokenizer::new();
/// let tokens: Vec<_> = tokenizer.tokenize("hello 日本語").unwrap().map(|t| t.text).collect();
/// assert_eq!(tokens, vec!["hello", "日本", "本語", "語"]);
/// ```
#[derive(Clone, Debug)]
pub struct BigramTokenizer {
    split_alpha: bool,
    split_digit: bool,
    split_symbol: bool,
}

impl BigramTokenizer {
    /// Create a bigram tokenizer that keeps alphabetic, numeric and symbol
    /// runs whole.
    pub fn new() -> Self {
        BigramTokenizer {
            split_alpha: false,
            split_digit: false,
            split_symbol: false,
        }
    }

    /// Create a bigram tokenizer that also splits alphabetic and symbol runs.
    pub fn split_symbol_alpha() -> Self {
        BigramTokenizer {
            split_alpha: true,
            split_digit: false,
            split_symbol: true,
        }
    }

    /// Create a bigram tokenizer that splits every character class.
    pub fn split_all() -> Self {
        BigramTokenizer {
            split_alpha: true,
            split_digit: true,
            split_symbol: true,
        }
    }

    fn is_grouped(&self, token_type: TokenType) -> bool {
        match token_type {
            TokenType::Alpha => !self.split_alpha,
            TokenType::Num => !self.split_digit,
            TokenType::Symbol => !self.split_symbol,
            TokenType::Cjk | TokenType::Other => false,
        }
    }
}

impl Default for BigramTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for BigramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let byte_end = |i: usize| chars.get(i).map_or(text.len(), |(offset, _)| *offset);

        let mut tokens = Vec::new();
        let mut position = 0;
        let mut i = 0;

        while i < chars.len() {
            let (start_offset, c) = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            let token_type = TokenType::of_char(c);
            if self.is_grouped(token_type) {
                let mut end = i + 1;
                while end < chars.len() && TokenType::of_char(chars[end].1) == token_type {
                    end += 1;
                }
                let end_offset = byte_end(end);
                tokens.push(
                    Token::with_offsets(
                        &text[start_offset..end_offset],
                        position,
                        start_offset,
                        end_offset,
                    )
                    .with_token_type(token_type),
                );
                position += 1;
                i = end;
                continue;
            }

            let pairs_with_next = chars.get(i + 1).is_some_and(|&(_, next)| {
                !next.is_whitespace() && !self.is_grouped(TokenType::of_char(next))
            });
            let end_offset = byte_end(if pairs_with_next { i + 2 } else { i + 1 });
            tokens.push(
                Token::with_offsets(
                    &text[start_offset..end_offset],
                    position,
                    start_offset,
                    end_offset,
                )
                .with_token_type(token_type),
            );
            position += 1;
            i += 1;
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "bigram"
    }
}
