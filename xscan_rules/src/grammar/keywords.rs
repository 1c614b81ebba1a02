//! Reserved words of the rule language

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // Rule structure
    Rule,
    Private,
    Global,
    Meta,
    Strings,
    Condition,

    // String modifiers
    Nocase,
    Wide,
    Ascii,
    Fullword,

    // Condition expressions
    True,
    False,
    And,
    Or,
    Not,
    Of,
    Them,
    Any,
    All,
    None,
    Filesize,
}

impl Keyword {
    /// Exact, case-sensitive match
    pub fn from_str(s: &str) -> Option<Self> {
        let keyword = match s {
            "rule" => Keyword::Rule,
            "private" => Keyword::Private,
            "global" => Keyword::Global,
            "meta" => Keyword::Meta,
            "strings" => Keyword::Strings,
            "condition" => Keyword::Condition,
            "nocase" => Keyword::Nocase,
            "wide" => Keyword::Wide,
            "ascii" => Keyword::Ascii,
            "fullword" => Keyword::Fullword,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "of" => Keyword::Of,
            "them" => Keyword::Them,
            "any" => Keyword::Any,
            "all" => Keyword::All,
            "none" => Keyword::None,
            "filesize" => Keyword::Filesize,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Rule => "rule",
            Keyword::Private => "private",
            Keyword::Global => "global",
            Keyword::Meta => "meta",
            Keyword::Strings => "strings",
            Keyword::Condition => "condition",
            Keyword::Nocase => "nocase",
            Keyword::Wide => "wide",
            Keyword::Ascii => "ascii",
            Keyword::Fullword => "fullword",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Of => "of",
            Keyword::Them => "them",
            Keyword::Any => "any",
            Keyword::All => "all",
            Keyword::None => "none",
            Keyword::Filesize => "filesize",
        }
    }

    pub fn is_rule_modifier(&self) -> bool {
        matches!(self, Keyword::Private | Keyword::Global)
    }

    pub fn is_string_modifier(&self) -> bool {
        matches!(
            self,
            Keyword::Nocase | Keyword::Wide | Keyword::Ascii | Keyword::Fullword
        )
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Keyword::Meta | Keyword::Strings | Keyword::Condition)
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn is_reserved_keyword(s: &str) -> bool {
    Keyword::from_str(s).is_some()
}
