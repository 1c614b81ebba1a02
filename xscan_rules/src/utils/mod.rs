//! Shared primitive types used by the rule lexer, parser and validator.

pub mod span;

pub use span::{Position, SourceMap, Span, Spanned};
