//! Semantic validation errors for rule declarations

use crate::logging::{codes, Code};
use crate::utils::Span;
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate rule identifier \"{name}\"")]
    DuplicateRule { name: String, span: Span },

    #[error("duplicate string identifier \"${identifier}\" in rule \"{rule}\"")]
    DuplicateString {
        rule: String,
        identifier: String,
        span: Span,
    },

    #[error("undefined string identifier \"${identifier}\" in rule \"{rule}\"")]
    UndefinedString {
        rule: String,
        identifier: String,
        span: Span,
    },

    #[error("undefined identifier \"{name}\" in rule \"{rule}\"")]
    UndefinedRule {
        rule: String,
        name: String,
        span: Span,
    },

    #[error("unreferenced string \"${identifier}\" in rule \"{rule}\"")]
    UnreferencedString {
        rule: String,
        identifier: String,
        span: Span,
    },

    #[error("rule \"{rule}\" has no condition")]
    MissingCondition { rule: String, span: Span },

    #[error("invalid hex string \"${identifier}\": {reason}")]
    InvalidHexString {
        identifier: String,
        reason: String,
        span: Span,
    },

    #[error("invalid regular expression \"${identifier}\": {reason}")]
    InvalidRegex {
        identifier: String,
        reason: String,
        span: Span,
    },

    #[error("modifier '{modifier}' is not valid for {kind} string \"${identifier}\"")]
    InvalidModifier {
        identifier: String,
        modifier: &'static str,
        kind: &'static str,
        span: Span,
    },

    #[error("empty string \"${identifier}\"")]
    EmptyString { identifier: String, span: Span },

    #[error("type mismatch in rule \"{rule}\": {message}")]
    TypeMismatch {
        rule: String,
        message: String,
        span: Span,
    },

    #[error("{limit} exceeded: {actual} (max {max})")]
    LimitExceeded {
        limit: &'static str,
        actual: usize,
        max: usize,
        span: Span,
    },
}

impl ValidationError {
    pub fn error_code(&self) -> Code {
        match self {
            ValidationError::DuplicateRule { .. } => codes::validation::DUPLICATE_RULE,
            ValidationError::DuplicateString { .. } => codes::validation::DUPLICATE_STRING,
            ValidationError::UndefinedString { .. } => codes::validation::UNDEFINED_STRING,
            ValidationError::UndefinedRule { .. } => codes::validation::UNDEFINED_RULE,
            ValidationError::UnreferencedString { .. } => codes::validation::UNREFERENCED_STRING,
            ValidationError::MissingCondition { .. } => codes::validation::MISSING_CONDITION,
            ValidationError::InvalidHexString { .. } => codes::validation::INVALID_HEX_STRING,
            ValidationError::InvalidRegex { .. } => codes::validation::INVALID_REGEX,
            ValidationError::InvalidModifier { .. } => codes::validation::INVALID_MODIFIER,
            ValidationError::EmptyString { .. } => codes::validation::EMPTY_STRING,
            ValidationError::TypeMismatch { .. } => codes::validation::TYPE_MISMATCH,
            ValidationError::LimitExceeded { .. } => codes::validation::LIMIT_EXCEEDED,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ValidationError::DuplicateRule { span, .. }
            | ValidationError::DuplicateString { span, .. }
            | ValidationError::UndefinedString { span, .. }
            | ValidationError::UndefinedRule { span, .. }
            | ValidationError::UnreferencedString { span, .. }
            | ValidationError::MissingCondition { span, .. }
            | ValidationError::InvalidHexString { span, .. }
            | ValidationError::InvalidRegex { span, .. }
            | ValidationError::InvalidModifier { span, .. }
            | ValidationError::EmptyString { span, .. }
            | ValidationError::TypeMismatch { span, .. }
            | ValidationError::LimitExceeded { span, .. } => *span,
        }
    }
}
