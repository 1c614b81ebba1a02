//! Implementation limits on rule sets

use super::error::{ValidationError, ValidationResult};
use crate::config::compile_time::rules::{MAX_RULES, MAX_STRINGS_PER_RULE};
use crate::grammar::ast::nodes::{RuleDecl, RuleSource};

/// `existing` counts rules already accepted into the same set
pub fn check_rule_count(source: &RuleSource, existing: usize) -> ValidationResult<()> {
    let total = existing + source.rules.len();
    if total > MAX_RULES {
        let first_over = MAX_RULES.saturating_sub(existing);
        let span = source.rules.get(first_over).map(|r| r.span).unwrap_or_default();
        return Err(ValidationError::LimitExceeded {
            limit: "rule count",
            actual: total,
            max: MAX_RULES,
            span,
        });
    }
    Ok(())
}

pub fn check_string_count(rule: &RuleDecl) -> ValidationResult<()> {
    if rule.strings.len() > MAX_STRINGS_PER_RULE {
        return Err(ValidationError::LimitExceeded {
            limit: "strings per rule",
            actual: rule.strings.len(),
            max: MAX_STRINGS_PER_RULE,
            span: rule.span,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Span;

    fn rule(name: &str) -> RuleDecl {
        RuleDecl {
            name: name.to_string(),
            span: Span::default(),
            is_private: false,
            is_global: false,
            tags: vec![],
            meta: vec![],
            strings: vec![],
            condition: None,
        }
    }

    #[test]
    fn test_rule_count_includes_existing_rules() {
        let source = RuleSource {
            rules: vec![rule("a"), rule("b")],
        };
        assert!(check_rule_count(&source, MAX_RULES - 2).is_ok());
        assert!(matches!(
            check_rule_count(&source, MAX_RULES - 1),
            Err(ValidationError::LimitExceeded { actual, .. }) if actual == MAX_RULES + 1
        ));
    }
}
