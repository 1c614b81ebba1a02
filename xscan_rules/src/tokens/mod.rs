//! Token types produced by the lexer and consumed by the parser

pub mod token;
pub mod token_stream;

pub use token::Token;
pub use token_stream::{SpannedToken, TokenStream};
