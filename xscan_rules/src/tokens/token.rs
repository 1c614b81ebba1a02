//! Token definitions for the rule language

use crate::grammar::keywords::Keyword;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),

    /// `$name`; an empty name is the anonymous `$`
    StringIdentifier(String),
    /// `$prefix*`
    StringWildcard(String),
    /// `#name`
    StringCount(String),

    /// Quoted text with escapes already resolved
    Text(Vec<u8>),
    /// Body of a `{ ... }` hex string, unparsed
    HexString(String),
    /// `/pattern/flags`
    Regex {
        pattern: String,
        case_insensitive: bool,
        dot_matches_newline: bool,
    },
    /// Integer literal with any `KB`/`MB` multiplier applied
    Integer(i64),

    Colon,
    Assign,
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    Comma,

    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    Eof,
}

impl Token {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Token::Equal
                | Token::NotEqual
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual
        )
    }

    /// Short description used in syntax diagnostics
    pub fn describe(&self) -> String {
        match self {
            Token::Keyword(k) => format!("keyword '{}'", k),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::StringIdentifier(name) => format!("'${}'", name),
            Token::StringWildcard(prefix) => format!("'${}*'", prefix),
            Token::StringCount(name) => format!("'#{}'", name),
            Token::Text(_) => "text string".to_string(),
            Token::HexString(_) => "hex string".to_string(),
            Token::Regex { .. } => "regular expression".to_string(),
            Token::Integer(value) => format!("integer {}", value),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::StringIdentifier(name) => write!(f, "${}", name),
            Token::StringWildcard(prefix) => write!(f, "${}*", prefix),
            Token::StringCount(name) => write!(f, "#{}", name),
            Token::Text(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Token::HexString(body) => write!(f, "{{{}}}", body),
            Token::Regex { pattern, .. } => write!(f, "/{}/", pattern),
            Token::Integer(value) => write!(f, "{}", value),
            Token::Colon => write!(f, ":"),
            Token::Assign => write!(f, "="),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_and_display() {
        assert_eq!(Token::StringWildcard("a".into()).to_string(), "$a*");
        assert_eq!(Token::LessEqual.to_string(), "<=");
        assert_eq!(Token::Keyword(Keyword::Them).describe(), "keyword 'them'");
        assert_eq!(Token::Colon.describe(), "':'");
    }

    #[test]
    fn test_comparison_classification() {
        assert!(Token::GreaterEqual.is_comparison());
        assert!(!Token::Assign.is_comparison());
    }
}
