//! Semantic validation of parsed rules
//!
//! Rules are validated in declaration order; each rule sees only the names of
//! the rules accepted before it.

pub mod error;
pub mod limits;
pub mod references;

pub use error::{ValidationError, ValidationResult};

use crate::config::runtime::CompilerPreferences;
use crate::grammar::ast::nodes::{RuleDecl, RuleSource};
use crate::log_error;
use std::collections::HashSet;

pub fn validate_rule(
    rule: &RuleDecl,
    declared_rules: &HashSet<&str>,
    preferences: &CompilerPreferences,
) -> ValidationResult<()> {
    if declared_rules.contains(rule.name.as_str()) {
        return Err(ValidationError::DuplicateRule {
            name: rule.name.clone(),
            span: rule.span,
        });
    }

    limits::check_string_count(rule)?;
    references::check_string_declarations(rule)?;

    let condition = rule
        .condition
        .as_ref()
        .ok_or_else(|| ValidationError::MissingCondition {
            rule: rule.name.clone(),
            span: rule.span,
        })?;

    references::check_condition_types(rule, condition)?;
    references::check_references(
        rule,
        condition,
        declared_rules,
        preferences.reject_unreferenced_strings,
    )
}

/// Validate every rule of a source against `already_declared` plus its own earlier rules
pub fn validate_rule_source(
    source: &RuleSource,
    already_declared: &HashSet<&str>,
    preferences: &CompilerPreferences,
) -> ValidationResult<()> {
    limits::check_rule_count(source, already_declared.len())?;

    let mut declared: HashSet<&str> = already_declared.clone();
    for rule in &source.rules {
        if let Err(error) = validate_rule(rule, &declared, preferences) {
            log_error!(error.error_code(), "Rule failed validation",
                span = error.span(),
                "rule" => rule.name,
                "error" => error
            );
            return Err(error);
        }
        declared.insert(rule.name.as_str());
    }
    Ok(())
}
