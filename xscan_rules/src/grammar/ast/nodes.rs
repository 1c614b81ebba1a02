//! Abstract syntax tree for rule sources
//!
//! Every node that can be the subject of a diagnostic carries its span.

use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed rule source, rules in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSource {
    pub rules: Vec<RuleDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl {
    pub name: String,
    pub span: Span,
    pub is_private: bool,
    pub is_global: bool,
    pub tags: Vec<String>,
    pub meta: Vec<MetaEntry>,
    pub strings: Vec<StringDecl>,
    /// `None` when the rule has no `condition:` section
    pub condition: Option<Expression>,
}

// === META ===

#[derive(Debug, Clone, PartialEq)]
pub struct MetaEntry {
    pub key: String,
    pub value: MetaValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(text) => write!(f, "{}", text),
            MetaValue::Integer(value) => write!(f, "{}", value),
            MetaValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

// === STRINGS ===

#[derive(Debug, Clone, PartialEq)]
pub struct StringDecl {
    /// Name without the leading `$`
    pub identifier: String,
    pub value: PatternValue,
    pub modifiers: StringModifiers,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternValue {
    Text(Vec<u8>),
    /// Raw body between the braces
    Hex(String),
    Regex {
        pattern: String,
        case_insensitive: bool,
        dot_matches_newline: bool,
    },
}

impl PatternValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PatternValue::Text(_) => "text",
            PatternValue::Hex(_) => "hex",
            PatternValue::Regex { .. } => "regex",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringModifiers {
    pub nocase: bool,
    pub wide: bool,
    pub ascii: bool,
    pub fullword: bool,
}

impl StringModifiers {
    /// `ascii` is implied unless only `wide` was requested
    pub fn matches_ascii(&self) -> bool {
        self.ascii || !self.wide
    }
}

// === CONDITIONS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl ComparisonOp {
    pub fn apply(&self, left: i64, right: i64) -> bool {
        match self {
            ComparisonOp::Equal => left == right,
            ComparisonOp::NotEqual => left != right,
            ComparisonOp::Less => left < right,
            ComparisonOp::LessEqual => left <= right,
            ComparisonOp::Greater => left > right,
            ComparisonOp::GreaterEqual => left >= right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
    None,
    AtLeast(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetItem {
    Identifier(String),
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringSet {
    Them,
    Items(Vec<SetItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Boolean(bool),
    /// `$a`
    StringMatch { identifier: String, span: Span },
    /// `#a`
    StringCount { identifier: String, span: Span },
    Integer(i64),
    Filesize,
    /// Name of a previously declared rule
    RuleReference { name: String, span: Span },
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Of {
        quantifier: Quantifier,
        set: StringSet,
        span: Span,
    },
}

impl Expression {
    /// Integer-valued expressions may only appear as comparison operands
    pub fn is_integer_valued(&self) -> bool {
        matches!(
            self,
            Expression::Integer(_) | Expression::Filesize | Expression::StringCount { .. }
        )
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Expression::StringMatch { span, .. }
            | Expression::StringCount { span, .. }
            | Expression::RuleReference { span, .. }
            | Expression::Comparison { span, .. }
            | Expression::Of { span, .. } => Some(*span),
            Expression::Not(inner) => inner.span(),
            Expression::And(left, right) | Expression::Or(left, right) => {
                match (left.span(), right.span()) {
                    (Some(l), Some(r)) => Some(l.to(r)),
                    (l, r) => l.or(r),
                }
            }
            Expression::Boolean(_) | Expression::Integer(_) | Expression::Filesize => None,
        }
    }

    /// Visit this expression and every sub-expression, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Not(inner) => inner.walk(visit),
            Expression::And(left, right)
            | Expression::Or(left, right)
            | Expression::Comparison { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_ops() {
        assert!(ComparisonOp::LessEqual.apply(3, 3));
        assert!(!ComparisonOp::Greater.apply(3, 3));
        assert!(ComparisonOp::NotEqual.apply(1, 2));
    }

    #[test]
    fn test_walk_visits_all_nodes() {
        let expr = Expression::And(
            Box::new(Expression::Not(Box::new(Expression::Boolean(true)))),
            Box::new(Expression::Filesize),
        );
        let mut count = 0;
        expr.walk(&mut |_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_meta_value_display() {
        assert_eq!(MetaValue::Integer(-4).to_string(), "-4");
        assert_eq!(MetaValue::Text("x".into()).to_string(), "x");
        assert_eq!(MetaValue::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_ascii_is_default_modifier() {
        let mut modifiers = StringModifiers::default();
        assert!(modifiers.matches_ascii());
        modifiers.wide = true;
        assert!(!modifiers.matches_ascii());
        modifiers.ascii = true;
        assert!(modifiers.matches_ascii());
    }
}
