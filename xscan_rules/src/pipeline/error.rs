use crate::lexical::LexerError;
use crate::logging::Code;
use crate::syntax::SyntaxError;
use crate::utils::{SourceMap, Span};
use crate::validation::ValidationError;
use std::fmt;

/// Compilation stage that rejected a rule source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationStage {
    Lexical,
    Syntax,
    Validation,
}

impl fmt::Display for CompilationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilationStage::Lexical => "lexical",
            CompilationStage::Syntax => "syntax",
            CompilationStage::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Raw diagnostic for a rejected rule source
///
/// `line` and `column` are 1-based and point at the start of the offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct RuleCompilationError {
    pub code: Code,
    pub stage: CompilationStage,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

impl RuleCompilationError {
    pub fn error_code(&self) -> Code {
        self.code
    }

    /// Render the diagnostic against the source it was produced from
    pub fn diagnostic(&self, source: &str) -> String {
        SourceMap::new(source).format_error(&self.span, &self.message)
    }

    fn at(code: Code, stage: CompilationStage, message: String, span: Span) -> Self {
        Self {
            code,
            stage,
            message,
            line: span.start.line,
            column: span.start.column,
            span,
        }
    }
}

impl From<LexerError> for RuleCompilationError {
    fn from(error: LexerError) -> Self {
        Self::at(
            error.error_code(),
            CompilationStage::Lexical,
            error.to_string(),
            Span::point(error.position()),
        )
    }
}

impl From<SyntaxError> for RuleCompilationError {
    fn from(error: SyntaxError) -> Self {
        Self::at(
            error.error_code(),
            CompilationStage::Syntax,
            error.to_string(),
            error.span(),
        )
    }
}

impl From<ValidationError> for RuleCompilationError {
    fn from(error: ValidationError) -> Self {
        Self::at(
            error.error_code(),
            CompilationStage::Validation,
            error.to_string(),
            error.span(),
        )
    }
}
