//! Translation of string declarations into byte regexes
//!
//! Text strings become escaped literals, hex strings become byte-level
//! patterns with wildcards, jumps and alternations, and regex strings are
//! compiled with Unicode disabled so `\xHH` escapes match raw bytes.

use crate::config::compile_time::rules::MAX_HEX_JUMP;
use crate::grammar::ast::nodes::{PatternValue, StringDecl, StringModifiers};
use crate::validation::ValidationError;
use regex::bytes::{Regex, RegexBuilder};
use std::fmt::Write;

/// One compiled alternative of a string: ascii or wide form
#[derive(Debug, Clone)]
pub struct PatternVariant {
    pub regex: Regex,
    pub wide: bool,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub identifier: String,
    pub variants: Vec<PatternVariant>,
    pub fullword: bool,
}

impl CompiledPattern {
    /// Number of occurrences in `data`; overlapping occurrences each count
    pub fn count_matches(&self, data: &[u8]) -> usize {
        self.variants
            .iter()
            .map(|variant| self.count_variant(variant, data))
            .sum()
    }

    fn count_variant(&self, variant: &PatternVariant, data: &[u8]) -> usize {
        let mut count = 0;
        let mut position = 0;
        while position <= data.len() {
            let Some(found) = variant.regex.find_at(data, position) else {
                break;
            };
            if !self.fullword || is_word_bounded(data, found.start(), found.end(), variant.wide) {
                count += 1;
            }
            position = found.start() + 1;
        }
        count
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
}

fn is_word_bounded(data: &[u8], start: usize, end: usize, wide: bool) -> bool {
    let step = if wide { 2 } else { 1 };
    let before = start.checked_sub(step).map(|i| data[i]);
    let after = data.get(end).copied();
    !before.is_some_and(is_word_byte) && !after.is_some_and(is_word_byte)
}

pub fn compile_pattern(
    decl: &StringDecl,
    regex_size_limit: usize,
) -> Result<CompiledPattern, ValidationError> {
    let variants = match &decl.value {
        PatternValue::Text(bytes) => {
            compile_text(bytes, decl.modifiers, regex_size_limit).map_err(|reason| {
                ValidationError::InvalidRegex {
                    identifier: decl.identifier.clone(),
                    reason,
                    span: decl.span,
                }
            })?
        }
        PatternValue::Hex(body) => {
            let invalid = |reason: String| ValidationError::InvalidHexString {
                identifier: decl.identifier.clone(),
                reason,
                span: decl.span,
            };
            let pattern = hex_to_regex(body).map_err(invalid)?;
            let regex = build(&pattern, false, true, regex_size_limit).map_err(invalid)?;
            vec![PatternVariant { regex, wide: false }]
        }
        PatternValue::Regex {
            pattern,
            case_insensitive,
            dot_matches_newline,
        } => {
            let regex = build(
                pattern,
                *case_insensitive || decl.modifiers.nocase,
                *dot_matches_newline,
                regex_size_limit,
            )
            .map_err(|reason| ValidationError::InvalidRegex {
                identifier: decl.identifier.clone(),
                reason,
                span: decl.span,
            })?;
            vec![PatternVariant { regex, wide: false }]
        }
    };

    Ok(CompiledPattern {
        identifier: decl.identifier.clone(),
        variants,
        fullword: decl.modifiers.fullword,
    })
}

fn build(
    pattern: &str,
    case_insensitive: bool,
    dot_matches_newline: bool,
    size_limit: usize,
) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .unicode(false)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(dot_matches_newline)
        .size_limit(size_limit)
        .build()
        .map_err(|e| e.to_string())
}

fn escape_bytes(bytes: impl Iterator<Item = u8>) -> String {
    let mut out = String::new();
    for byte in bytes {
        let _ = write!(out, "\\x{:02X}", byte);
    }
    out
}

fn compile_text(
    bytes: &[u8],
    modifiers: StringModifiers,
    size_limit: usize,
) -> Result<Vec<PatternVariant>, String> {
    let mut variants = Vec::new();
    if modifiers.matches_ascii() {
        let pattern = escape_bytes(bytes.iter().copied());
        variants.push(PatternVariant {
            regex: build(&pattern, modifiers.nocase, false, size_limit)?,
            wide: false,
        });
    }
    if modifiers.wide {
        let pattern = escape_bytes(bytes.iter().flat_map(|b| [*b, 0u8]));
        variants.push(PatternVariant {
            regex: build(&pattern, modifiers.nocase, false, size_limit)?,
            wide: true,
        });
    }
    Ok(variants)
}

// ============================================================================
// HEX STRINGS
// ============================================================================

/// Translate a hex string body into regex syntax matching raw bytes
///
/// Supports `4D`, `??`, nibble wildcards `?A`/`A?`, jumps `[n]`, `[n-m]`,
/// `[n-]`, `[-]`, and alternations `( 01 | 02 03 )` that may nest.
pub fn hex_to_regex(body: &str) -> Result<String, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut parser = HexParser {
        chars: &chars,
        index: 0,
    };
    let (pattern, byte_count) = parser.sequence(0)?;
    if parser.index < chars.len() {
        return Err(format!("unexpected '{}'", chars[parser.index]));
    }
    if byte_count == 0 {
        return Err("hex string contains no bytes".to_string());
    }
    Ok(pattern)
}

struct HexParser<'a> {
    chars: &'a [char],
    index: usize,
}

/// A parsed element; jumps may not start or end a sequence
enum HexItem {
    Bytes(String),
    Jump(String),
    Group(String),
}

impl HexParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.index < self.chars.len() && self.chars[self.index].is_whitespace() {
            self.index += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.index).copied()
    }

    /// Parse items until `|`, `)` or end; returns pattern and number of byte tokens
    fn sequence(&mut self, depth: usize) -> Result<(String, usize), String> {
        let mut items: Vec<HexItem> = Vec::new();
        let mut byte_count = 0;

        while let Some(c) = self.peek() {
            match c {
                '|' | ')' => break,
                '[' => items.push(HexItem::Jump(self.jump()?)),
                '(' => {
                    if depth >= 8 {
                        return Err("alternations nested too deeply".to_string());
                    }
                    self.index += 1;
                    let mut alternatives = Vec::new();
                    loop {
                        let (alternative, count) = self.sequence(depth + 1)?;
                        if count == 0 {
                            return Err("empty alternative".to_string());
                        }
                        byte_count += count;
                        alternatives.push(alternative);
                        match self.peek() {
                            Some('|') => self.index += 1,
                            Some(')') => {
                                self.index += 1;
                                break;
                            }
                            _ => return Err("unbalanced '('".to_string()),
                        }
                    }
                    items.push(HexItem::Group(format!("(?:{})", alternatives.join("|"))));
                }
                _ => {
                    items.push(HexItem::Bytes(self.byte()?));
                    byte_count += 1;
                }
            }
        }

        if let Some(HexItem::Jump(_)) = items.first() {
            return Err("jump at start of hex string or alternative".to_string());
        }
        if let Some(HexItem::Jump(_)) = items.last() {
            return Err("jump at end of hex string or alternative".to_string());
        }
        if depth == 0 && self.peek() == Some(')') {
            return Err("unbalanced ')'".to_string());
        }
        if depth == 0 && self.peek() == Some('|') {
            return Err("alternation outside parentheses".to_string());
        }

        let pattern = items
            .into_iter()
            .map(|item| match item {
                HexItem::Bytes(s) | HexItem::Jump(s) | HexItem::Group(s) => s,
            })
            .collect();
        Ok((pattern, byte_count))
    }

    fn nibble(&mut self) -> Result<Option<u8>, String> {
        let c = self
            .chars
            .get(self.index)
            .copied()
            .ok_or_else(|| "incomplete byte".to_string())?;
        self.index += 1;
        match c {
            '?' => Ok(None),
            c => c
                .to_digit(16)
                .map(|d| Some(d as u8))
                .ok_or_else(|| format!("invalid hex digit '{}'", c)),
        }
    }

    fn byte(&mut self) -> Result<String, String> {
        let high = self.nibble()?;
        let low = self.nibble()?;
        Ok(match (high, low) {
            (Some(h), Some(l)) => format!("\\x{:02X}", (h << 4) | l),
            (None, None) => "(?s-u:.)".to_string(),
            (Some(h), None) => format!("[\\x{:02X}-\\x{:02X}]", h << 4, (h << 4) | 0x0F),
            (None, Some(l)) => {
                let mut class = String::from("[");
                for h in 0..16u8 {
                    let _ = write!(class, "\\x{:02X}", (h << 4) | l);
                }
                class.push(']');
                class
            }
        })
    }

    fn number(&mut self) -> Option<u32> {
        self.skip_whitespace();
        let start = self.index;
        while self.index < self.chars.len() && self.chars[self.index].is_ascii_digit() {
            self.index += 1;
        }
        if start == self.index {
            return None;
        }
        self.chars[start..self.index]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }

    fn jump(&mut self) -> Result<String, String> {
        self.index += 1;
        let low = self.number();
        let (low, high) = if self.peek() == Some('-') {
            self.index += 1;
            (low.unwrap_or(0), self.number())
        } else {
            let exact = low.ok_or_else(|| "invalid jump".to_string())?;
            (exact, Some(exact))
        };
        if self.peek() != Some(']') {
            return Err("unterminated jump".to_string());
        }
        self.index += 1;

        if let Some(high) = high {
            if low > high {
                return Err(format!("invalid jump range [{}-{}]", low, high));
            }
            if high > MAX_HEX_JUMP {
                return Err(format!("jump too large (max {})", MAX_HEX_JUMP));
            }
            Ok(format!("(?s-u:.){{{},{}}}", low, high))
        } else {
            if low > MAX_HEX_JUMP {
                return Err(format!("jump too large (max {})", MAX_HEX_JUMP));
            }
            Ok(format!("(?s-u:.){{{},}}", low))
        }
    }
}
