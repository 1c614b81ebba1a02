//! Cursor over lexed tokens used by the parser

use crate::tokens::token::Token;
use crate::utils::{Span, Spanned};

pub type SpannedToken = Spanned<Token>;

/// Token sequence that always ends in `Token::Eof`
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl TokenStream {
    /// Appends an `Eof` token when the input does not already end with one
    pub fn new(mut tokens: Vec<SpannedToken>) -> Self {
        if !matches!(tokens.last().map(|t| &t.value), Some(Token::Eof)) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or_default();
            tokens.push(Spanned::new(Token::Eof, Span::point(end)));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Current token; sticks at `Eof`
    pub fn current(&self) -> &SpannedToken {
        let index = self.position.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub fn current_token(&self) -> &Token {
        &self.current().value
    }

    pub fn current_span(&self) -> Span {
        self.current().span
    }

    pub fn peek_ahead(&self, n: usize) -> &SpannedToken {
        let index = (self.position + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// Consume the current token and return it
    pub fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of tokens, including the trailing `Eof`
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    #[test]
    fn test_stream_sticks_at_eof() {
        let span = Span::point(Position::start());
        let mut stream = TokenStream::new(vec![Spanned::new(Token::Colon, span)]);

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.advance().value, Token::Colon);
        assert!(stream.is_at_end());
        assert_eq!(stream.advance().value, Token::Eof);
        assert_eq!(stream.peek_ahead(5).value, Token::Eof);
    }

    #[test]
    fn test_empty_stream_is_eof() {
        let stream = TokenStream::new(Vec::new());
        assert!(stream.is_empty());
        assert!(stream.is_at_end());
    }
}
