//! Identifier resolution and condition typing for a single rule

use super::error::{ValidationError, ValidationResult};
use crate::grammar::ast::nodes::*;
use crate::utils::Span;
use std::collections::{BTreeSet, HashSet};

/// Resolve every `$`, `#`, `of` and rule reference in the condition
///
/// `declared_rules` holds only rules declared before this one, so forward and
/// self references are reported as undefined.
pub fn check_references(
    rule: &RuleDecl,
    condition: &Expression,
    declared_rules: &HashSet<&str>,
    reject_unreferenced: bool,
) -> ValidationResult<()> {
    let declared: Vec<&str> = rule.strings.iter().map(|s| s.identifier.as_str()).collect();
    let mut used: BTreeSet<&str> = BTreeSet::new();
    let mut first_error: Option<ValidationError> = None;

    let undefined_string = |identifier: &str, span: Span| ValidationError::UndefinedString {
        rule: rule.name.clone(),
        identifier: identifier.to_string(),
        span,
    };

    condition.walk(&mut |expr| {
        if first_error.is_some() {
            return;
        }
        match expr {
            Expression::StringMatch { identifier, span }
            | Expression::StringCount { identifier, span } => {
                match declared.iter().find(|d| **d == identifier.as_str()) {
                    Some(found) => {
                        used.insert(*found);
                    }
                    None => first_error = Some(undefined_string(identifier, *span)),
                }
            }
            Expression::Of { set, span, .. } => match set {
                StringSet::Them => {
                    if declared.is_empty() {
                        first_error = Some(undefined_string("*", *span));
                    }
                    used.extend(declared.iter().copied());
                }
                StringSet::Items(items) => {
                    for item in items {
                        let matched: Vec<&str> = match item {
                            SetItem::Identifier(name) => declared
                                .iter()
                                .copied()
                                .filter(|d| *d == name.as_str())
                                .collect(),
                            SetItem::Wildcard(prefix) => declared
                                .iter()
                                .copied()
                                .filter(|d| d.starts_with(prefix.as_str()))
                                .collect(),
                        };
                        if matched.is_empty() {
                            let shown = match item {
                                SetItem::Identifier(name) => name.clone(),
                                SetItem::Wildcard(prefix) => format!("{}*", prefix),
                            };
                            first_error = Some(undefined_string(&shown, *span));
                            return;
                        }
                        used.extend(matched);
                    }
                }
            },
            Expression::RuleReference { name, span } => {
                if !declared_rules.contains(name.as_str()) {
                    first_error = Some(ValidationError::UndefinedRule {
                        rule: rule.name.clone(),
                        name: name.clone(),
                        span: *span,
                    });
                }
            }
            _ => {}
        }
    });

    if let Some(error) = first_error {
        return Err(error);
    }

    if reject_unreferenced {
        if let Some(unused) = rule
            .strings
            .iter()
            .find(|s| !used.contains(s.identifier.as_str()))
        {
            return Err(ValidationError::UnreferencedString {
                rule: rule.name.clone(),
                identifier: unused.identifier.clone(),
                span: unused.span,
            });
        }
    }

    Ok(())
}

/// The condition must be boolean and comparisons must compare integers
pub fn check_condition_types(rule: &RuleDecl, expr: &Expression) -> ValidationResult<()> {
    let mismatch = |message: &str, span: Option<Span>| ValidationError::TypeMismatch {
        rule: rule.name.clone(),
        message: message.to_string(),
        span: span.unwrap_or(rule.span),
    };

    match expr {
        Expression::Boolean(_)
        | Expression::StringMatch { .. }
        | Expression::RuleReference { .. }
        | Expression::Of { .. } => Ok(()),
        Expression::Not(inner) => check_condition_types(rule, inner),
        Expression::And(left, right) | Expression::Or(left, right) => {
            check_condition_types(rule, left)?;
            check_condition_types(rule, right)
        }
        Expression::Comparison {
            left, right, span, ..
        } => {
            if left.is_integer_valued() && right.is_integer_valued() {
                Ok(())
            } else {
                Err(mismatch("comparison operands must be integers", Some(*span)))
            }
        }
        Expression::Integer(_) | Expression::Filesize | Expression::StringCount { .. } => {
            Err(mismatch("integer used where a boolean is expected", expr.span()))
        }
    }
}

/// Duplicate identifiers, empty patterns and modifiers that do not apply
pub fn check_string_declarations(rule: &RuleDecl) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for decl in &rule.strings {
        if !seen.insert(decl.identifier.as_str()) {
            return Err(ValidationError::DuplicateString {
                rule: rule.name.clone(),
                identifier: decl.identifier.clone(),
                span: decl.span,
            });
        }

        let empty = match &decl.value {
            PatternValue::Text(bytes) => bytes.is_empty(),
            PatternValue::Hex(body) => body.trim().is_empty(),
            PatternValue::Regex { pattern, .. } => pattern.is_empty(),
        };
        if empty {
            return Err(ValidationError::EmptyString {
                identifier: decl.identifier.clone(),
                span: decl.span,
            });
        }

        let m = decl.modifiers;
        let invalid = match &decl.value {
            PatternValue::Text(_) => None,
            PatternValue::Hex(_) => [
                (m.nocase, "nocase"),
                (m.wide, "wide"),
                (m.ascii, "ascii"),
                (m.fullword, "fullword"),
            ]
            .into_iter()
            .find(|(set, _)| *set),
            PatternValue::Regex { .. } => [(m.wide, "wide"), (m.fullword, "fullword")]
                .into_iter()
                .find(|(set, _)| *set),
        };
        if let Some((_, modifier)) = invalid {
            return Err(ValidationError::InvalidModifier {
                identifier: decl.identifier.clone(),
                modifier,
                kind: decl.value.kind(),
                span: decl.span,
            });
        }
    }
    Ok(())
}
