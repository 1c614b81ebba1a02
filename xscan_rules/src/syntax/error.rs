//! Syntax errors raised while building the rule syntax tree

use crate::logging::{codes, Code};
use crate::utils::Span;

pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: String, span: Span },

    #[error("condition nested too deeply (max {max_depth})")]
    MaxRecursionDepth { max_depth: usize, span: Span },

    #[error("{message}")]
    GrammarViolation { message: String, span: Span },
}

impl SyntaxError {
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, span: Span) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.to_string(),
            span,
        }
    }

    pub fn grammar_violation(message: impl Into<String>, span: Span) -> Self {
        Self::GrammarViolation {
            message: message.into(),
            span,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            SyntaxError::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            SyntaxError::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END_OF_INPUT,
            SyntaxError::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
            SyntaxError::GrammarViolation { .. } => codes::syntax::GRAMMAR_VIOLATION,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SyntaxError::UnexpectedToken { span, .. }
            | SyntaxError::UnexpectedEndOfInput { span, .. }
            | SyntaxError::MaxRecursionDepth { span, .. }
            | SyntaxError::GrammarViolation { span, .. } => *span,
        }
    }
}
