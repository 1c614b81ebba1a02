//! Lexical analyzer for rule sources
//!
//! The lexer is context sensitive in one place: directly after `$name =` an
//! opening brace starts a hex string and a slash starts a regular expression.
//! Everywhere else `{` is a block delimiter and a lone `/` is invalid.

use crate::config::constants::compile_time::lexical::*;
use crate::grammar::keywords::Keyword;
use crate::logging::codes;
use crate::tokens::{SpannedToken, Token, TokenStream};
use crate::utils::{Position, Span, Spanned};
use crate::{log_debug, log_error};
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    #[error("invalid character '{character}'")]
    InvalidCharacter { character: char, position: Position },

    #[error("unterminated string literal")]
    UnterminatedString { position: Position },

    #[error("unterminated hex string")]
    UnterminatedHexString { position: Position },

    #[error("unterminated regular expression")]
    UnterminatedRegex { position: Position },

    #[error("unterminated block comment")]
    UnterminatedComment { position: Position },

    #[error("invalid escape sequence '\\{sequence}'")]
    InvalidEscape { sequence: String, position: Position },

    #[error("invalid number '{text}': {reason}")]
    InvalidNumber {
        text: String,
        reason: &'static str,
        position: Position,
    },

    #[error("identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize, position: Position },

    #[error("string too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize, position: Position },

    #[error("rule source too large: {size} bytes (max {MAX_SOURCE_SIZE})")]
    SourceTooLarge { size: usize },

    #[error("too many tokens (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { position: Position },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::InvalidCharacter { .. } => codes::lexical::INVALID_CHARACTER,
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::UnterminatedHexString { .. } => codes::lexical::UNTERMINATED_HEX_STRING,
            LexerError::UnterminatedRegex { .. } => codes::lexical::UNTERMINATED_REGEX,
            LexerError::UnterminatedComment { .. } => codes::lexical::UNTERMINATED_COMMENT,
            LexerError::InvalidEscape { .. } => codes::lexical::INVALID_ESCAPE,
            LexerError::InvalidNumber { .. } => codes::lexical::INVALID_NUMBER,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::SourceTooLarge { .. } | LexerError::TooManyTokens { .. } => {
                codes::lexical::SOURCE_TOO_LARGE
            }
        }
    }

    /// Where the offending token starts
    pub fn position(&self) -> Position {
        match self {
            LexerError::InvalidCharacter { position, .. }
            | LexerError::UnterminatedString { position }
            | LexerError::UnterminatedHexString { position }
            | LexerError::UnterminatedRegex { position }
            | LexerError::UnterminatedComment { position }
            | LexerError::InvalidEscape { position, .. }
            | LexerError::InvalidNumber { position, .. }
            | LexerError::IdentifierTooLong { position, .. }
            | LexerError::StringTooLarge { position, .. }
            | LexerError::TooManyTokens { position } => *position,
            LexerError::SourceTooLarge { .. } => Position::start(),
        }
    }
}

/// Counters reported after a successful tokenization
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub pattern_literals: usize,
    pub comments: usize,
}

/// Character cursor that keeps line and column in step with the byte offset
struct Cursor<'a> {
    chars: Peekable<CharIndices<'a>>,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            position: Position::start(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1).map(|(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        self.position = self.position.advance(ch);
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }
}

pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            metrics: LexicalMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    pub fn tokenize(&mut self, source: &str) -> Result<TokenStream, LexerError> {
        self.metrics = LexicalMetrics::default();

        if source.len() > MAX_SOURCE_SIZE {
            let error = LexerError::SourceTooLarge { size: source.len() };
            log_error!(error.error_code(), "Rule source rejected",
                "size" => source.len(),
                "limit" => MAX_SOURCE_SIZE
            );
            return Err(error);
        }

        let mut cursor = Cursor::new(source);
        let mut tokens: Vec<SpannedToken> = Vec::new();

        loop {
            self.skip_trivia(&mut cursor)?;
            let start = cursor.position;
            let Some(ch) = cursor.peek() else {
                break;
            };

            if tokens.len() >= MAX_TOKEN_COUNT {
                return Err(LexerError::TooManyTokens { position: start });
            }

            let token = match ch {
                '"' => {
                    self.metrics.pattern_literals += 1;
                    lex_text(&mut cursor)?
                }
                '{' if expects_pattern_value(&tokens) => {
                    self.metrics.pattern_literals += 1;
                    lex_hex(&mut cursor)?
                }
                '/' if expects_pattern_value(&tokens) => {
                    self.metrics.pattern_literals += 1;
                    lex_regex(&mut cursor)?
                }
                '$' => lex_string_reference(&mut cursor)?,
                '#' => lex_string_count(&mut cursor)?,
                '0'..='9' => lex_integer(&mut cursor, false)?,
                '-' if cursor.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    cursor.bump();
                    lex_integer(&mut cursor, true)?
                }
                c if c.is_ascii_alphabetic() || c == '_' => lex_word(&mut cursor)?,
                _ => lex_punctuation(&mut cursor, ch)?,
            };

            tokens.push(Spanned::new(token, Span::new(start, cursor.position)));
        }

        let eof = cursor.position;
        tokens.push(Spanned::new(Token::Eof, Span::point(eof)));
        self.metrics.total_tokens = tokens.len();

        log_debug!("Rule source tokenized",
            "tokens" => self.metrics.total_tokens,
            "pattern_literals" => self.metrics.pattern_literals,
            "comments" => self.metrics.comments
        );

        Ok(TokenStream::new(tokens))
    }

    fn skip_trivia(&mut self, cursor: &mut Cursor<'_>) -> Result<(), LexerError> {
        loop {
            match (cursor.peek(), cursor.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    cursor.bump();
                }
                (Some('/'), Some('/')) => {
                    self.metrics.comments += 1;
                    while let Some(c) = cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        cursor.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.metrics.comments += 1;
                    let start = cursor.position;
                    cursor.bump();
                    cursor.bump();
                    loop {
                        match cursor.bump() {
                            Some('*') if cursor.peek() == Some('/') => {
                                cursor.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(LexerError::UnterminatedComment { position: start }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// True right after `$name =`
fn expects_pattern_value(tokens: &[SpannedToken]) -> bool {
    match tokens {
        [.., before, last] => {
            matches!(last.value, Token::Assign)
                && matches!(before.value, Token::StringIdentifier(_))
        }
        _ => false,
    }
}

fn read_identifier_chars(cursor: &mut Cursor<'_>) -> String {
    let mut text = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }
    text
}

fn check_identifier_length(name: &str, position: Position) -> Result<(), LexerError> {
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(LexerError::IdentifierTooLong {
            length: name.len(),
            position,
        });
    }
    Ok(())
}

fn lex_word(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    let word = read_identifier_chars(cursor);
    check_identifier_length(&word, start)?;

    Ok(match Keyword::from_str(&word) {
        Some(keyword) => Token::Keyword(keyword),
        None => Token::Identifier(word),
    })
}

fn lex_string_reference(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    cursor.bump();
    let name = read_identifier_chars(cursor);
    check_identifier_length(&name, start)?;

    if cursor.eat('*') {
        Ok(Token::StringWildcard(name))
    } else {
        Ok(Token::StringIdentifier(name))
    }
}

fn lex_string_count(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    cursor.bump();
    let name = read_identifier_chars(cursor);
    if name.is_empty() {
        return Err(LexerError::InvalidCharacter {
            character: '#',
            position: start,
        });
    }
    check_identifier_length(&name, start)?;
    Ok(Token::StringCount(name))
}

fn lex_text(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    cursor.bump();
    let mut bytes = Vec::new();
    let mut utf8 = [0u8; 4];

    loop {
        let escape_position = cursor.position;
        match cursor.bump() {
            None | Some('\n') => return Err(LexerError::UnterminatedString { position: start }),
            Some('"') => break,
            Some('\\') => match cursor.bump() {
                Some('n') => bytes.push(b'\n'),
                Some('t') => bytes.push(b'\t'),
                Some('r') => bytes.push(b'\r'),
                Some('"') => bytes.push(b'"'),
                Some('\\') => bytes.push(b'\\'),
                Some('x') => {
                    let high = cursor.bump();
                    let low = cursor.bump();
                    let digits: String = [high, low].iter().flatten().collect();
                    match u8::from_str_radix(&digits, 16) {
                        Ok(byte) if digits.len() == 2 => bytes.push(byte),
                        _ => {
                            return Err(LexerError::InvalidEscape {
                                sequence: format!("x{}", digits),
                                position: escape_position,
                            })
                        }
                    }
                }
                Some(other) => {
                    return Err(LexerError::InvalidEscape {
                        sequence: other.to_string(),
                        position: escape_position,
                    })
                }
                None => return Err(LexerError::UnterminatedString { position: start }),
            },
            Some(c) => bytes.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes()),
        }

        if bytes.len() > MAX_STRING_SIZE {
            return Err(LexerError::StringTooLarge {
                size: bytes.len(),
                position: start,
            });
        }
    }

    Ok(Token::Text(bytes))
}

fn lex_hex(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    cursor.bump();
    let mut body = String::new();

    loop {
        match cursor.bump() {
            None => return Err(LexerError::UnterminatedHexString { position: start }),
            Some('}') => break,
            Some(c) => body.push(c),
        }
        if body.len() > MAX_STRING_SIZE {
            return Err(LexerError::StringTooLarge {
                size: body.len(),
                position: start,
            });
        }
    }

    Ok(Token::HexString(body))
}

fn lex_regex(cursor: &mut Cursor<'_>) -> Result<Token, LexerError> {
    let start = cursor.position;
    cursor.bump();
    let mut pattern = String::new();

    loop {
        match cursor.bump() {
            None | Some('\n') => return Err(LexerError::UnterminatedRegex { position: start }),
            Some('/') => break,
            Some('\\') => match cursor.bump() {
                Some('/') => pattern.push('/'),
                Some('\n') | None => {
                    return Err(LexerError::UnterminatedRegex { position: start })
                }
                Some(c) => {
                    pattern.push('\\');
                    pattern.push(c);
                }
            },
            Some(c) => pattern.push(c),
        }
        if pattern.len() > MAX_STRING_SIZE {
            return Err(LexerError::StringTooLarge {
                size: pattern.len(),
                position: start,
            });
        }
    }

    let mut case_insensitive = false;
    let mut dot_matches_newline = false;
    loop {
        match cursor.peek() {
            Some('i') => case_insensitive = true,
            Some('s') => dot_matches_newline = true,
            _ => break,
        }
        cursor.bump();
    }

    Ok(Token::Regex {
        pattern,
        case_insensitive,
        dot_matches_newline,
    })
}

fn lex_integer(cursor: &mut Cursor<'_>, negative: bool) -> Result<Token, LexerError> {
    let start = cursor.position;
    let mut text = String::new();
    let radix = if cursor.peek() == Some('0') && matches!(cursor.peek_second(), Some('x' | 'X')) {
        cursor.bump();
        cursor.bump();
        16
    } else {
        10
    };

    while let Some(c) = cursor.peek() {
        if c.is_digit(radix) {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    let invalid = |text: &str, reason: &'static str| LexerError::InvalidNumber {
        text: text.to_string(),
        reason,
        position: start,
    };

    if text.is_empty() {
        return Err(invalid("0x", "missing digits"));
    }

    let multiplier: i64 = match (cursor.peek(), cursor.peek_second()) {
        (Some('K'), Some('B')) => 1024,
        (Some('M'), Some('B')) => 1024 * 1024,
        _ => 1,
    };
    if multiplier > 1 {
        cursor.bump();
        cursor.bump();
    }

    if cursor
        .peek()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid(&text, "unexpected character after number"));
    }

    let value = i64::from_str_radix(&text, radix)
        .ok()
        .and_then(|v| v.checked_mul(multiplier))
        .ok_or_else(|| invalid(&text, "integer overflow"))?;

    Ok(Token::Integer(if negative { -value } else { value }))
}

fn lex_punctuation(cursor: &mut Cursor<'_>, ch: char) -> Result<Token, LexerError> {
    let position = cursor.position;
    cursor.bump();

    let token = match ch {
        ':' => Token::Colon,
        ',' => Token::Comma,
        '{' => Token::LeftBrace,
        '}' => Token::RightBrace,
        '(' => Token::LeftParen,
        ')' => Token::RightParen,
        '=' if cursor.eat('=') => Token::Equal,
        '=' => Token::Assign,
        '!' if cursor.eat('=') => Token::NotEqual,
        '<' if cursor.eat('=') => Token::LessEqual,
        '<' => Token::Less,
        '>' if cursor.eat('=') => Token::GreaterEqual,
        '>' => Token::Greater,
        character => {
            return Err(LexerError::InvalidCharacter {
                character,
                position,
            })
        }
    };
    Ok(token)
}
