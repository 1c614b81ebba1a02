//! Recursive-descent parser for rule sources
//!
//! Condition precedence, loosest first: `or`, `and`, `not`, comparison.

use crate::config::constants::compile_time::syntax::MAX_CONDITION_DEPTH;
use crate::grammar::ast::nodes::*;
use crate::grammar::keywords::Keyword;
use crate::syntax::error::{SyntaxError, SyntaxResult};
use crate::tokens::{SpannedToken, Token, TokenStream};
use crate::utils::Span;

pub struct RuleParser {
    tokens: TokenStream,
    depth: usize,
}

impl RuleParser {
    pub fn new(tokens: TokenStream) -> Self {
        Self { tokens, depth: 0 }
    }

    /// Parse every rule up to end of input
    pub fn parse_rule_source(&mut self) -> SyntaxResult<RuleSource> {
        let mut rules = Vec::new();
        while !self.tokens.is_at_end() {
            rules.push(self.parse_rule()?);
        }
        Ok(RuleSource { rules })
    }

    // === TOKEN HELPERS ===

    fn error_here(&self, expected: &str) -> SyntaxError {
        let current = self.tokens.current();
        match current.value {
            Token::Eof => SyntaxError::unexpected_end_of_input(expected, current.span),
            ref other => SyntaxError::unexpected_token(expected, &other.describe(), current.span),
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.tokens.current_token().is_keyword(keyword)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.tokens.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> SyntaxResult<SpannedToken> {
        if self.check_keyword(keyword) {
            Ok(self.tokens.advance())
        } else {
            Err(self.error_here(&format!("'{}'", keyword)))
        }
    }

    fn expect(&mut self, expected: Token) -> SyntaxResult<SpannedToken> {
        if *self.tokens.current_token() == expected {
            Ok(self.tokens.advance())
        } else {
            Err(self.error_here(&format!("'{}'", expected)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> SyntaxResult<(String, Span)> {
        match self.tokens.current_token() {
            Token::Identifier(_) => {
                let token = self.tokens.advance();
                match token.value {
                    Token::Identifier(name) => Ok((name, token.span)),
                    _ => Err(SyntaxError::grammar_violation("expected identifier", token.span)),
                }
            }
            _ => Err(self.error_here(what)),
        }
    }

    // === RULES ===

    fn parse_rule(&mut self) -> SyntaxResult<RuleDecl> {
        let start = self.tokens.current_span();
        let mut is_private = false;
        let mut is_global = false;
        loop {
            if self.eat_keyword(Keyword::Private) {
                is_private = true;
            } else if self.eat_keyword(Keyword::Global) {
                is_global = true;
            } else {
                break;
            }
        }

        self.expect_keyword(Keyword::Rule)?;
        let (name, name_span) = self.expect_identifier("rule name")?;

        let mut tags = Vec::new();
        if *self.tokens.current_token() == Token::Colon {
            self.tokens.advance();
            while let Token::Identifier(_) = self.tokens.current_token() {
                let (tag, _) = self.expect_identifier("tag")?;
                tags.push(tag);
            }
            if tags.is_empty() {
                return Err(self.error_here("tag"));
            }
        }

        self.expect(Token::LeftBrace)?;

        let mut meta = Vec::new();
        let mut strings = Vec::new();
        let mut condition = None;

        if self.eat_keyword(Keyword::Meta) {
            self.expect(Token::Colon)?;
            while let Token::Identifier(_) = self.tokens.current_token() {
                meta.push(self.parse_meta_entry()?);
            }
        }

        if self.eat_keyword(Keyword::Strings) {
            self.expect(Token::Colon)?;
            while let Token::StringIdentifier(_) = self.tokens.current_token() {
                strings.push(self.parse_string_decl()?);
            }
            if strings.is_empty() {
                return Err(self.error_here("string declaration"));
            }
        }

        if self.eat_keyword(Keyword::Condition) {
            self.expect(Token::Colon)?;
            self.depth = 0;
            condition = Some(self.parse_or()?);
        }

        let end = self.expect(Token::RightBrace)?;

        Ok(RuleDecl {
            name,
            span: start.to(name_span).to(end.span),
            is_private,
            is_global,
            tags,
            meta,
            strings,
            condition,
        })
    }

    fn parse_meta_entry(&mut self) -> SyntaxResult<MetaEntry> {
        let (key, key_span) = self.expect_identifier("meta key")?;
        self.expect(Token::Assign)?;

        let value_token = self.tokens.current().clone();
        let value = match value_token.value {
            Token::Text(bytes) => MetaValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Token::Integer(value) => MetaValue::Integer(value),
            Token::Keyword(Keyword::True) => MetaValue::Boolean(true),
            Token::Keyword(Keyword::False) => MetaValue::Boolean(false),
            _ => return Err(self.error_here("meta value")),
        };
        self.tokens.advance();

        Ok(MetaEntry {
            key,
            value,
            span: key_span.to(value_token.span),
        })
    }

    fn parse_string_decl(&mut self) -> SyntaxResult<StringDecl> {
        let ident = self.tokens.advance();
        let identifier = match ident.value {
            Token::StringIdentifier(name) if !name.is_empty() => name,
            _ => {
                return Err(SyntaxError::grammar_violation(
                    "string declarations must be named",
                    ident.span,
                ))
            }
        };
        self.expect(Token::Assign)?;

        let value_token = self.tokens.current().clone();
        let value = match value_token.value {
            Token::Text(bytes) => PatternValue::Text(bytes),
            Token::HexString(body) => PatternValue::Hex(body),
            Token::Regex {
                pattern,
                case_insensitive,
                dot_matches_newline,
            } => PatternValue::Regex {
                pattern,
                case_insensitive,
                dot_matches_newline,
            },
            _ => return Err(self.error_here("text, hex or regex string")),
        };
        self.tokens.advance();

        let mut modifiers = StringModifiers::default();
        let mut span = ident.span.to(value_token.span);
        while let Token::Keyword(keyword) = self.tokens.current_token() {
            let keyword = *keyword;
            if !keyword.is_string_modifier() {
                break;
            }
            let token = self.tokens.advance();
            span = span.to(token.span);
            match keyword {
                Keyword::Nocase => modifiers.nocase = true,
                Keyword::Wide => modifiers.wide = true,
                Keyword::Ascii => modifiers.ascii = true,
                Keyword::Fullword => modifiers.fullword = true,
                _ => {}
            }
        }

        Ok(StringDecl {
            identifier,
            value,
            modifiers,
            span,
        })
    }

    // === CONDITIONS ===

    fn enter(&mut self) -> SyntaxResult<()> {
        self.depth += 1;
        if self.depth > MAX_CONDITION_DEPTH {
            return Err(SyntaxError::MaxRecursionDepth {
                max_depth: MAX_CONDITION_DEPTH,
                span: self.tokens.current_span(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_or(&mut self) -> SyntaxResult<Expression> {
        self.enter()?;
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        self.leave();
        Ok(left)
    }

    fn parse_and(&mut self) -> SyntaxResult<Expression> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> SyntaxResult<Expression> {
        if self.eat_keyword(Keyword::Not) {
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> SyntaxResult<Expression> {
        let left = self.parse_primary()?;

        let op = match self.tokens.current_token() {
            Token::Equal => ComparisonOp::Equal,
            Token::NotEqual => ComparisonOp::NotEqual,
            Token::Less => ComparisonOp::Less,
            Token::LessEqual => ComparisonOp::LessEqual,
            Token::Greater => ComparisonOp::Greater,
            Token::GreaterEqual => ComparisonOp::GreaterEqual,
            _ => return Ok(left),
        };
        let op_span = self.tokens.advance().span;
        let right = self.parse_primary()?;

        let span = [left.span(), right.span()]
            .into_iter()
            .flatten()
            .fold(op_span, |acc, s| acc.to(s));

        Ok(Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_primary(&mut self) -> SyntaxResult<Expression> {
        let token = self.tokens.current().clone();
        match token.value {
            Token::Keyword(Keyword::True) => {
                self.tokens.advance();
                Ok(Expression::Boolean(true))
            }
            Token::Keyword(Keyword::False) => {
                self.tokens.advance();
                Ok(Expression::Boolean(false))
            }
            Token::Keyword(Keyword::Filesize) => {
                self.tokens.advance();
                Ok(Expression::Filesize)
            }
            Token::Keyword(Keyword::Any) => self.parse_of(Quantifier::Any, token.span),
            Token::Keyword(Keyword::All) => self.parse_of(Quantifier::All, token.span),
            Token::Keyword(Keyword::None) => self.parse_of(Quantifier::None, token.span),
            Token::Integer(value) => {
                if self.tokens.peek_ahead(1).value.is_keyword(Keyword::Of) {
                    if value < 0 {
                        return Err(SyntaxError::grammar_violation(
                            "quantifier must not be negative",
                            token.span,
                        ));
                    }
                    self.parse_of(Quantifier::AtLeast(value), token.span)
                } else {
                    self.tokens.advance();
                    Ok(Expression::Integer(value))
                }
            }
            Token::StringIdentifier(identifier) => {
                self.tokens.advance();
                if identifier.is_empty() {
                    return Err(SyntaxError::grammar_violation(
                        "anonymous string reference outside a loop",
                        token.span,
                    ));
                }
                Ok(Expression::StringMatch {
                    identifier,
                    span: token.span,
                })
            }
            Token::StringCount(identifier) => {
                self.tokens.advance();
                Ok(Expression::StringCount {
                    identifier,
                    span: token.span,
                })
            }
            Token::Identifier(name) => {
                self.tokens.advance();
                Ok(Expression::RuleReference {
                    name,
                    span: token.span,
                })
            }
            Token::LeftParen => {
                self.tokens.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::Keyword(Keyword::Them) | Token::StringWildcard(_) => {
                Err(SyntaxError::grammar_violation(
                    format!("{} is only valid after 'of'", token.value.describe()),
                    token.span,
                ))
            }
            _ => Err(self.error_here("expression")),
        }
    }

    /// `<quantifier> of them` or `<quantifier> of ($a, $b*)`
    fn parse_of(&mut self, quantifier: Quantifier, start: Span) -> SyntaxResult<Expression> {
        self.tokens.advance();
        self.expect_keyword(Keyword::Of)?;

        if self.check_keyword(Keyword::Them) {
            let end = self.tokens.advance().span;
            return Ok(Expression::Of {
                quantifier,
                set: StringSet::Them,
                span: start.to(end),
            });
        }

        self.expect(Token::LeftParen)?;
        let mut items = Vec::new();
        loop {
            let token = self.tokens.current().clone();
            let item = match token.value {
                Token::StringIdentifier(name) if !name.is_empty() => SetItem::Identifier(name),
                Token::StringWildcard(prefix) => SetItem::Wildcard(prefix),
                _ => return Err(self.error_here("string identifier")),
            };
            self.tokens.advance();
            items.push(item);

            if *self.tokens.current_token() == Token::Comma {
                self.tokens.advance();
            } else {
                break;
            }
        }
        let end = self.expect(Token::RightParen)?.span;

        Ok(Expression::Of {
            quantifier,
            set: StringSet::Items(items),
            span: start.to(end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> SyntaxResult<RuleSource> {
        RuleParser::new(tokenize(source).unwrap()).parse_rule_source()
    }

    #[test]
    fn test_full_rule_structure() {
        let source = r#"
            private rule eval_call : js suspicious {
                meta:
                    author = "sec"
                    severity = 3
                    enabled = true
                strings:
                    $a = "eval(" nocase fullword
                    $b = { 65 76 ?? 6C }
                    $c = /atob\(/i
                condition:
                    any of them and #a > 2
            }
        "#;
        let parsed = parse(source).unwrap();
        let rule = &parsed.rules[0];

        assert_eq!(rule.name, "eval_call");
        assert!(rule.is_private);
        assert!(!rule.is_global);
        assert_eq!(rule.tags, vec!["js", "suspicious"]);
        assert_eq!(rule.meta.len(), 3);
        assert_eq!(rule.meta[1].value, MetaValue::Integer(3));
        assert_eq!(rule.strings.len(), 3);
        assert!(rule.strings[0].modifiers.nocase);
        assert!(rule.strings[0].modifiers.fullword);
        assert_matches!(rule.strings[1].value, PatternValue::Hex(_));
        assert_matches!(rule.condition, Some(Expression::And(_, _)));
    }

    #[test]
    fn test_precedence_or_binds_loosest() {
        let parsed = parse("rule a { condition: true or false and not true }").unwrap();
        let condition = parsed.rules[0].condition.clone().unwrap();
        match condition {
            Expression::Or(left, right) => {
                assert_eq!(*left, Expression::Boolean(true));
                assert_matches!(*right, Expression::And(_, _));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_of_expressions() {
        let parsed = parse(
            "rule a { strings: $x1 = \"a\" $y = \"b\" condition: 2 of ($x*, $y) or none of them }",
        )
        .unwrap();
        let mut sets = Vec::new();
        parsed.rules[0]
            .condition
            .as_ref()
            .unwrap()
            .walk(&mut |e| {
                if let Expression::Of { quantifier, set, .. } = e {
                    sets.push((*quantifier, set.clone()));
                }
            });

        assert_eq!(sets.len(), 2);
        assert_eq!(
            sets[0],
            (
                Quantifier::AtLeast(2),
                StringSet::Items(vec![
                    SetItem::Wildcard("x".into()),
                    SetItem::Identifier("y".into())
                ])
            )
        );
        assert_eq!(sets[1], (Quantifier::None, StringSet::Them));
    }

    #[test]
    fn test_missing_condition_parses() {
        let parsed = parse("rule a { meta: k = 1 }").unwrap();
        assert!(parsed.rules[0].condition.is_none());
    }

    #[test]
    fn test_unexpected_token_reports_position() {
        let error = parse("rule a {\n  condition: true true\n}").unwrap_err();
        assert_matches!(error, SyntaxError::UnexpectedToken { .. });
        assert_eq!(error.span().start.line, 2);
        assert_eq!(error.span().start.column, 19);
    }

    #[test]
    fn test_unexpected_end_of_input() {
        assert_matches!(
            parse("rule a { condition:"),
            Err(SyntaxError::UnexpectedEndOfInput { .. })
        );
    }

    #[test]
    fn test_nesting_depth_limit() {
        let deep = format!(
            "rule a {{ condition: {}true{} }}",
            "(".repeat(MAX_CONDITION_DEPTH + 1),
            ")".repeat(MAX_CONDITION_DEPTH + 1)
        );
        assert_matches!(parse(&deep), Err(SyntaxError::MaxRecursionDepth { .. }));
    }

    #[test]
    fn test_them_outside_of_is_rejected() {
        assert_matches!(
            parse("rule a { condition: them }"),
            Err(SyntaxError::GrammarViolation { .. })
        );
    }
}
