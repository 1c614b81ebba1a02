//! Compiled rule sets and buffer matching

pub mod evaluator;
pub mod patterns;

pub use evaluator::{Condition, Operand};
pub use patterns::CompiledPattern;

use crate::config::runtime::CompilerPreferences;
use crate::grammar::ast::nodes::RuleDecl;
use crate::validation::{ValidationError, ValidationResult};
use evaluator::{Resolver, ScanFacts};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A rule that evaluated true for a buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: String,
    pub tags: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub tags: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
    pub is_private: bool,
    pub is_global: bool,
    pub condition: Condition,
}

/// Immutable set of compiled rules
///
/// Built by [`Compiler`](crate::pipeline::Compiler); scanning borrows the set
/// immutably so one set can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
    patterns: Vec<CompiledPattern>,
}

impl CompiledRuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    /// Compile and append one validated rule
    ///
    /// On error the set is left unchanged.
    pub(crate) fn push_rule(
        &mut self,
        decl: &RuleDecl,
        preferences: &CompilerPreferences,
    ) -> ValidationResult<()> {
        let condition_expr = decl
            .condition
            .as_ref()
            .ok_or_else(|| ValidationError::MissingCondition {
                rule: decl.name.clone(),
                span: decl.span,
            })?;

        let base = self.patterns.len();
        let mut compiled = Vec::with_capacity(decl.strings.len());
        let mut strings = Vec::with_capacity(decl.strings.len());
        for (offset, string) in decl.strings.iter().enumerate() {
            compiled.push(patterns::compile_pattern(string, preferences.regex_size_limit)?);
            strings.push((string.identifier.clone(), base + offset));
        }

        let rule_indices: HashMap<String, usize> = self
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (rule.name.clone(), index))
            .collect();
        let condition = Resolver {
            rule: &decl.name,
            strings: &strings,
            rules: &rule_indices,
        }
        .resolve(condition_expr)?;

        self.patterns.extend(compiled);
        self.rules.push(CompiledRule {
            name: decl.name.clone(),
            tags: decl.tags.iter().cloned().collect(),
            meta: decl
                .meta
                .iter()
                .map(|entry| (entry.key.clone(), entry.value.to_string()))
                .collect(),
            is_private: decl.is_private,
            is_global: decl.is_global,
            condition,
        });
        Ok(())
    }

    /// Rules matching `data`, in declaration order
    ///
    /// Private rules are evaluated but not reported. When any global rule
    /// evaluates false nothing matches.
    pub fn scan(&self, data: &[u8]) -> Vec<RuleMatch> {
        if self.rules.is_empty() {
            return Vec::new();
        }

        let counts: Vec<usize> = self
            .patterns
            .iter()
            .map(|pattern| pattern.count_matches(data))
            .collect();

        let mut results: Vec<bool> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let facts = ScanFacts {
                counts: &counts,
                filesize: i64::try_from(data.len()).unwrap_or(i64::MAX),
                rule_results: &results,
            };
            let matched = facts.evaluate(&rule.condition);
            results.push(matched);
        }

        let global_failed = self
            .rules
            .iter()
            .zip(&results)
            .any(|(rule, matched)| rule.is_global && !matched);
        if global_failed {
            return Vec::new();
        }

        self.rules
            .iter()
            .zip(results)
            .filter(|(rule, matched)| *matched && !rule.is_private)
            .map(|(rule, _)| RuleMatch {
                rule: rule.name.clone(),
                tags: rule.tags.clone(),
                meta: rule.meta.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_compiled_rule_set_is_send_and_sync() {
        assert_send_sync::<CompiledRuleSet>();
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = CompiledRuleSet::default();
        assert!(set.is_empty());
        assert!(set.scan(b"anything").is_empty());
    }
}
