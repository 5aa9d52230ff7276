//! Whitespace tokenizer implementation.

use super::Tokenizer;

use crate::analysis::token::{Token, TokenStream, TokenType};
use crate::error::Result;

/// A tokenizer that splits text on whitespace.
///
/// Byte offsets point at the actual occurrence of each word, so repeated
/// words keep distinct offsets.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    /// Create a new whitespace tokenizer.
    pub fn new() -> Self {
        WhitespaceTokenizer
    }

    /// Detect token type from the first character of the word.
    fn detect_token_type(word: &str) -> TokenType {
        if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
            return TokenType::Num;
        }
        word.chars()
            .next()
            .map_or(TokenType::Other, TokenType::of_char)
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = Vec::new();
        let mut word_start: Option<usize> = None;

        let push_word = |start: usize, end: usize, tokens: &mut Vec<Token>| {
            let word = &text[start..end];
            let position = tokens.len();
            tokens.push(
                Token::with_offsets(word, position, start, end)
                    .with_token_type(Self::detect_token_type(word)),
            );
        };

        for (offset, c) in text.char_indices() {
            match (c.is_whitespace(), word_start) {
                (true, Some(start)) => {
                    push_word(start, offset, &mut tokens);
                    word_start = None;
                }
                (false, None) => word_start = Some(offset),
                _ => {}
            }
        }
        if let Some(start) = word_start {
            push_word(start, text.len(), &mut tokens);
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("hello  world\ttest").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "test");
        assert_eq!(tokens[2].position, 2);
    }

    #[test]
    fn test_repeated_words_keep_offsets() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("to be or not to be").unwrap().collect();

        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[4].text, "to");
        assert_eq!(tokens[4].start_offset, 13);
        assert_eq!(tokens[5].start_offset, 16);
        assert_eq!(tokens[5].end_offset, 18);
    }

    #[test]
    fn test_token_types() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("abc 123 日本").unwrap().collect();

        assert_eq!(tokens[0].token_type, Some(TokenType::Alpha));
        assert_eq!(tokens[1].token_type, Some(TokenType::Num));
        assert_eq!(tokens[2].token_type, Some(TokenType::Cjk));
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(WhitespaceTokenizer::new().name(), "whitespace");
    }
}
