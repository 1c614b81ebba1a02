//! Pattern rule compiler and matcher
//!
//! Rule sources in a YARA-compatible subset are tokenized, parsed, validated
//! and compiled into an immutable [`CompiledRuleSet`] that matches byte
//! buffers. The crate also owns the coded logging service and configuration
//! shared by the scanning crates.

pub mod config;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod syntax;
pub mod tokens;
pub mod utils;
pub mod validation;

pub use matching::{CompiledRuleSet, RuleMatch};
pub use pipeline::{compile, CompilationStage, Compiler, RuleCompilationError};
