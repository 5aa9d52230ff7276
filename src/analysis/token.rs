//! Token types for text analysis.
//!
//! A [`Token`] is one unit produced by a tokenizer: its text, its 0-based
//! position in the token stream, and the byte offsets it covers in the source
//! text.
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::token::{Token, TokenType};
//!
//! let token = Token::with_offsets("he", 0, 0, 2).with_token_type(TokenType::Alpha);
//! assert_eq!(token.text, "he");
//! assert_eq!(token.position, 0);
//! assert_eq!(token.token_type, Some(TokenType::Alpha));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A token represents a single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,

    /// Character class of the token content, when the tokenizer knows it
    pub token_type: Option<TokenType>,
}

/// Token type classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// Alphabetic text (Latin and other alphabetic scripts)
    Alpha,
    /// Numeric values
    Num,
    /// CJK (Chinese, Japanese, Korean) characters
    Cjk,
    /// Punctuation and other symbols
    Symbol,
    /// Other/unknown token types
    Other,
}

impl TokenType {
    /// Classify a single character.
    pub fn of_char(c: char) -> Self {
        if c.is_ascii_digit() {
            TokenType::Num
        } else if matches!(c,
            '\u{3040}'..='\u{30FF}' |  // Hiragana, Katakana
            '\u{3400}'..='\u{4DBF}' |  // CJK Extension A
            '\u{4E00}'..='\u{9FFF}' |  // CJK Unified Ideographs
            '\u{AC00}'..='\u{D7AF}'    // Hangul syllables
        ) {
            TokenType::Cjk
        } else if c.is_alphabetic() {
            TokenType::Alpha
        } else if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()) {
            TokenType::Symbol
        } else {
            TokenType::Other
        }
    }
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            token_type: None,
        }
    }

    /// Create a new token with text, position, and byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            token_type: None,
        }
    }

    /// Get the length of the token text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Set the token type.
    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    /// Clone this token with updated position.
    pub fn with_position(&self, position: usize) -> Self {
        let mut token = self.clone();
        token.position = position;
        token
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A token stream represents a sequence of tokens from a tokenizer.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;
