//! Resolved conditions and their evaluation against one buffer

use crate::grammar::ast::nodes::{ComparisonOp, Expression, Quantifier, SetItem, StringSet};
use crate::validation::{ValidationError, ValidationResult};
use std::collections::HashMap;

/// Condition with string and rule names replaced by indices
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Boolean(bool),
    Found(usize),
    Rule(usize),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Compare {
        op: ComparisonOp,
        left: Operand,
        right: Operand,
    },
    Of {
        quantifier: Quantifier,
        patterns: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Integer(i64),
    Filesize,
    Count(usize),
}

/// Name lookups available while resolving one rule's condition
pub struct Resolver<'a> {
    pub rule: &'a str,
    /// `(identifier, global pattern index)` in declaration order
    pub strings: &'a [(String, usize)],
    pub rules: &'a HashMap<String, usize>,
}

impl Resolver<'_> {
    fn string(&self, identifier: &str, expr: &Expression) -> ValidationResult<usize> {
        self.strings
            .iter()
            .find(|(name, _)| name == identifier)
            .map(|(_, index)| *index)
            .ok_or_else(|| ValidationError::UndefinedString {
                rule: self.rule.to_string(),
                identifier: identifier.to_string(),
                span: expr.span().unwrap_or_default(),
            })
    }

    fn set(&self, set: &StringSet) -> Vec<usize> {
        match set {
            StringSet::Them => self.strings.iter().map(|(_, index)| *index).collect(),
            StringSet::Items(items) => {
                let mut indices: Vec<usize> = Vec::new();
                for item in items {
                    for (name, index) in self.strings {
                        let selected = match item {
                            SetItem::Identifier(wanted) => name == wanted,
                            SetItem::Wildcard(prefix) => name.starts_with(prefix.as_str()),
                        };
                        if selected && !indices.contains(index) {
                            indices.push(*index);
                        }
                    }
                }
                indices
            }
        }
    }

    fn operand(&self, expr: &Expression) -> ValidationResult<Operand> {
        match expr {
            Expression::Integer(value) => Ok(Operand::Integer(*value)),
            Expression::Filesize => Ok(Operand::Filesize),
            Expression::StringCount { identifier, .. } => {
                Ok(Operand::Count(self.string(identifier, expr)?))
            }
            other => Err(ValidationError::TypeMismatch {
                rule: self.rule.to_string(),
                message: "comparison operands must be integers".to_string(),
                span: other.span().unwrap_or_default(),
            }),
        }
    }

    pub fn resolve(&self, expr: &Expression) -> ValidationResult<Condition> {
        Ok(match expr {
            Expression::Boolean(value) => Condition::Boolean(*value),
            Expression::StringMatch { identifier, .. } => {
                Condition::Found(self.string(identifier, expr)?)
            }
            Expression::RuleReference { name, span } => {
                let index = self.rules.get(name).copied().ok_or_else(|| {
                    ValidationError::UndefinedRule {
                        rule: self.rule.to_string(),
                        name: name.clone(),
                        span: *span,
                    }
                })?;
                Condition::Rule(index)
            }
            Expression::Not(inner) => Condition::Not(Box::new(self.resolve(inner)?)),
            Expression::And(left, right) => {
                Condition::And(Box::new(self.resolve(left)?), Box::new(self.resolve(right)?))
            }
            Expression::Or(left, right) => {
                Condition::Or(Box::new(self.resolve(left)?), Box::new(self.resolve(right)?))
            }
            Expression::Comparison {
                op, left, right, ..
            } => Condition::Compare {
                op: *op,
                left: self.operand(left)?,
                right: self.operand(right)?,
            },
            Expression::Of { quantifier, set, .. } => Condition::Of {
                quantifier: *quantifier,
                patterns: self.set(set),
            },
            Expression::Integer(_) | Expression::Filesize | Expression::StringCount { .. } => {
                return Err(ValidationError::TypeMismatch {
                    rule: self.rule.to_string(),
                    message: "integer used where a boolean is expected".to_string(),
                    span: expr.span().unwrap_or_default(),
                })
            }
        })
    }
}

/// Per-buffer facts a condition is evaluated against
pub struct ScanFacts<'a> {
    pub counts: &'a [usize],
    pub filesize: i64,
    /// Results of the rules evaluated so far, in declaration order
    pub rule_results: &'a [bool],
}

impl ScanFacts<'_> {
    fn count(&self, pattern: usize) -> usize {
        self.counts.get(pattern).copied().unwrap_or(0)
    }

    fn value(&self, operand: Operand) -> i64 {
        match operand {
            Operand::Integer(value) => value,
            Operand::Filesize => self.filesize,
            Operand::Count(pattern) => i64::try_from(self.count(pattern)).unwrap_or(i64::MAX),
        }
    }

    pub fn evaluate(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Boolean(value) => *value,
            Condition::Found(pattern) => self.count(*pattern) > 0,
            Condition::Rule(index) => self.rule_results.get(*index).copied().unwrap_or(false),
            Condition::Not(inner) => !self.evaluate(inner),
            Condition::And(left, right) => self.evaluate(left) && self.evaluate(right),
            Condition::Or(left, right) => self.evaluate(left) || self.evaluate(right),
            Condition::Compare { op, left, right } => op.apply(self.value(*left), self.value(*right)),
            Condition::Of {
                quantifier,
                patterns,
            } => {
                let found = patterns.iter().filter(|p| self.count(**p) > 0).count();
                match quantifier {
                    Quantifier::Any => found >= 1,
                    Quantifier::All => found == patterns.len(),
                    Quantifier::None => found == 0,
                    Quantifier::AtLeast(n) => i64::try_from(found).unwrap_or(i64::MAX) >= *n,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts<'a>(counts: &'a [usize], rule_results: &'a [bool]) -> ScanFacts<'a> {
        ScanFacts {
            counts,
            filesize: 100,
            rule_results,
        }
    }

    #[test]
    fn test_quantifiers() {
        let of = |quantifier| Condition::Of {
            quantifier,
            patterns: vec![0, 1, 2],
        };
        let f = facts(&[1, 0, 3], &[]);
        assert!(f.evaluate(&of(Quantifier::Any)));
        assert!(!f.evaluate(&of(Quantifier::All)));
        assert!(!f.evaluate(&of(Quantifier::None)));
        assert!(f.evaluate(&of(Quantifier::AtLeast(2))));
        assert!(!f.evaluate(&of(Quantifier::AtLeast(3))));
    }

    #[test]
    fn test_counts_filesize_and_rules() {
        let f = facts(&[4], &[true, false]);
        let count_gt = Condition::Compare {
            op: ComparisonOp::Greater,
            left: Operand::Count(0),
            right: Operand::Integer(3),
        };
        let small = Condition::Compare {
            op: ComparisonOp::Less,
            left: Operand::Filesize,
            right: Operand::Integer(1024),
        };
        assert!(f.evaluate(&Condition::And(Box::new(count_gt), Box::new(small))));
        assert!(f.evaluate(&Condition::Rule(0)));
        assert!(!f.evaluate(&Condition::Rule(1)));
        assert!(!f.evaluate(&Condition::Rule(7)));
    }

    #[test]
    fn test_wildcard_set_resolution_deduplicates() {
        let strings = vec![("ab".to_string(), 3), ("ac".to_string(), 4), ("b".to_string(), 5)];
        let rules = HashMap::new();
        let resolver = Resolver {
            rule: "r",
            strings: &strings,
            rules: &rules,
        };
        let set = StringSet::Items(vec![
            SetItem::Wildcard("a".into()),
            SetItem::Identifier("ab".into()),
        ]);
        assert_eq!(resolver.set(&set), vec![3, 4]);
        assert_eq!(resolver.set(&StringSet::Them), vec![3, 4, 5]);
    }
}
