//! Rule compilation pipeline: source -> tokens -> syntax tree -> validation -> compiled set

mod error;
mod stats;

pub use error::{CompilationStage, RuleCompilationError};
pub use stats::CompilationStats;

use crate::config::runtime::CompilerPreferences;
use crate::lexical::LexicalAnalyzer;
use crate::logging::{self, codes};
use crate::matching::CompiledRuleSet;
use std::collections::HashSet;
use std::time::Instant;

/// Compile a complete rule source, all or nothing
pub fn compile(source: &str) -> Result<CompiledRuleSet, RuleCompilationError> {
    let mut compiler = Compiler::new();
    compiler.add_source(source)?;
    Ok(compiler.build())
}

/// Incremental compiler
///
/// Each source is validated against the rules accepted so far. A rejected
/// source leaves the compiler exactly as it was, so callers can compile rules
/// one by one and keep the ones that succeed.
#[derive(Debug, Default)]
pub struct Compiler {
    preferences: CompilerPreferences,
    set: CompiledRuleSet,
    stats: CompilationStats,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(preferences: CompilerPreferences) -> Self {
        Self {
            preferences,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> &CompilationStats {
        &self.stats
    }

    pub fn rule_count(&self) -> usize {
        self.set.rule_count()
    }

    pub fn add_source(&mut self, source: &str) -> Result<(), RuleCompilationError> {
        let start = Instant::now();
        let result = self.try_add(source);
        self.stats.total_time += start.elapsed();
        self.stats.bytes_processed += source.len();

        match &result {
            Ok(()) => self.stats.sources_accepted += 1,
            Err(error) => {
                self.stats.sources_rejected += 1;
                crate::log_error!(error.error_code(), "Rule source rejected",
                    span = error.span,
                    "stage" => error.stage,
                    "line" => error.line,
                    "column" => error.column,
                    "error" => error.message
                );
            }
        }
        result
    }

    fn try_add(&mut self, source: &str) -> Result<(), RuleCompilationError> {
        let mut analyzer = LexicalAnalyzer::new();
        let tokens = analyzer.tokenize(source)?;
        crate::log_debug!("Rule source tokenized",
            "tokens" => analyzer.metrics().total_tokens,
            "patterns" => analyzer.metrics().pattern_literals
        );

        let parsed = crate::syntax::parse_rule_source(tokens)?;

        let declared: HashSet<&str> = self.set.rule_names().collect();
        crate::validation::validate_rule_source(&parsed, &declared, &self.preferences)?;

        let mut staged = self.set.clone();
        for rule in &parsed.rules {
            staged.push_rule(rule, &self.preferences)?;
        }

        self.stats.rules_compiled += parsed.rules.len();
        self.stats.strings_compiled += parsed.rules.iter().map(|r| r.strings.len()).sum::<usize>();
        self.set = staged;
        Ok(())
    }

    pub fn build(self) -> CompiledRuleSet {
        if logging::config::log_compilation_summary() {
            crate::log_success!(codes::success::COMPILATION_COMPLETE, "Rule set compiled",
                "rules" => self.set.rule_count(),
                "patterns" => self.set.pattern_count(),
                "rejected_sources" => self.stats.sources_rejected
            );
        }
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_compile_empty_source() {
        let set = compile("").unwrap();
        assert!(set.is_empty());
        assert!(set.scan(b"data").is_empty());
    }

    #[test]
    fn test_compile_error_carries_position() {
        let error = compile("rule a {\n  condition: $x\n}").unwrap_err();
        assert_eq!(error.code, codes::validation::UNDEFINED_STRING);
        assert_eq!(error.stage, CompilationStage::Validation);
        assert_eq!(error.line, 2);
        assert!(error.diagnostic("rule a {\n  condition: $x\n}").contains("$x"));
    }

    #[test]
    fn test_lexical_error_stage() {
        let error = compile("rule a { condition: \"unterminated }").unwrap_err();
        assert_eq!(error.stage, CompilationStage::Lexical);
    }

    #[test]
    fn test_rejected_source_leaves_compiler_unchanged() {
        let mut compiler = Compiler::new();
        compiler
            .add_source(r#"rule good { strings: $a = "abc" condition: $a }"#)
            .unwrap();

        let rejected = compiler.add_source(r#"rule bad { strings: $a = { 4D [2] } condition: $a }"#);
        assert_matches!(rejected, Err(RuleCompilationError { stage: CompilationStage::Validation, .. }));

        // name of a rejected rule stays free
        compiler.add_source("rule bad { condition: good }").unwrap();

        assert_eq!(compiler.stats().sources_accepted, 2);
        assert_eq!(compiler.stats().sources_rejected, 1);

        let set = compiler.build();
        let names: Vec<_> = set.scan(b"xxabcxx").into_iter().map(|m| m.rule).collect();
        assert_eq!(names, vec!["good", "bad"]);
    }

    #[test]
    fn test_rule_references_across_sources() {
        let mut compiler = Compiler::new();
        compiler.add_source("rule first { condition: true }").unwrap();
        assert_matches!(
            compiler.add_source("rule first { condition: false }"),
            Err(RuleCompilationError { code, .. }) if code == codes::validation::DUPLICATE_RULE
        );
        assert_matches!(
            compiler.add_source("rule second { condition: third }"),
            Err(RuleCompilationError { code, .. }) if code == codes::validation::UNDEFINED_RULE
        );
        assert_eq!(compiler.rule_count(), 1);
    }
}
