//! Lexical analysis of rule sources

pub mod analyzer;

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics};

use crate::tokens::TokenStream;

/// Tokenize a rule source with a fresh analyzer
pub fn tokenize(source: &str) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize(source)
}
