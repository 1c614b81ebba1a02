//! Consolidated log codes and classification
//!
//! Single source of truth for every code the rule compiler and the scanning
//! layers emit, together with the metadata operators see in structured logs.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for error, warning and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Metadata attached to a code
#[derive(Debug, Clone)]
pub struct CodeMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
}

impl CodeMetadata {
    const fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        description: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            description,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const CONFIGURATION_ERROR: Code = Code::new("ERR003");
}

/// Rule source tokenization
pub mod lexical {
    use super::Code;

    pub const INVALID_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const INVALID_NUMBER: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E025");
    pub const UNTERMINATED_REGEX: Code = Code::new("E026");
    pub const INVALID_ESCAPE: Code = Code::new("E027");
    pub const SOURCE_TOO_LARGE: Code = Code::new("E028");
    pub const UNTERMINATED_HEX_STRING: Code = Code::new("E029");
}

/// Rule grammar
pub mod syntax {
    use super::Code;

    pub const UNEXPECTED_TOKEN: Code = Code::new("E040");
    pub const UNEXPECTED_END_OF_INPUT: Code = Code::new("E041");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E042");
    pub const GRAMMAR_VIOLATION: Code = Code::new("E043");
}

/// Rule-level semantic checks and pattern compilation
pub mod validation {
    use super::Code;

    pub const DUPLICATE_RULE: Code = Code::new("E060");
    pub const DUPLICATE_STRING: Code = Code::new("E061");
    pub const UNDEFINED_STRING: Code = Code::new("E062");
    pub const UNDEFINED_RULE: Code = Code::new("E063");
    pub const UNREFERENCED_STRING: Code = Code::new("E064");
    pub const INVALID_HEX_STRING: Code = Code::new("E065");
    pub const INVALID_REGEX: Code = Code::new("E066");
    pub const LIMIT_EXCEEDED: Code = Code::new("E067");
    pub const MISSING_CONDITION: Code = Code::new("E068");
    pub const INVALID_MODIFIER: Code = Code::new("E069");
    pub const TYPE_MISMATCH: Code = Code::new("E070");
    pub const EMPTY_STRING: Code = Code::new("E071");
}

/// Archive access
pub mod archive {
    use super::Code;

    pub const ARCHIVE_NOT_FOUND: Code = Code::new("E100");
    pub const CORRUPT_ARCHIVE: Code = Code::new("E101");
    pub const ENTRY_READ_FAILURE: Code = Code::new("E102");
    pub const ENTRY_TOO_LARGE: Code = Code::new("E103");
    pub const UNSAFE_ENTRY_PATH: Code = Code::new("E104");

    /// Content contained byte sequences that are not valid UTF-8
    pub const DECODE_REPLACEMENT: Code = Code::new("W100");
}

/// Scan attempts
pub mod scanner {
    use super::Code;

    pub const TARGET_NOT_FOUND: Code = Code::new("E120");
    pub const SCANNER_UNAVAILABLE: Code = Code::new("E121");
    pub const SCANNER_RESPONSE_ERROR: Code = Code::new("E122");
    pub const RULE_COMPILATION_FAILED: Code = Code::new("E123");
    pub const STORE_FAILURE: Code = Code::new("E124");
    pub const ACTION_FAILURE: Code = Code::new("E125");

    /// A rule was dropped from an isolated compilation
    pub const RULE_SKIPPED: Code = Code::new("W120");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const COMPILATION_COMPLETE: Code = Code::new("I060");
    pub const ARCHIVE_SCANNED: Code = Code::new("I100");
    pub const SCAN_RESULT_STORED: Code = Code::new("I120");
    pub const SCAN_SKIPPED: Code = Code::new("I121");
    pub const QUERY_RESULT_STORED: Code = Code::new("I130");
    pub const ACTION_DISPATCHED: Code = Code::new("I131");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

static CODE_REGISTRY: OnceLock<HashMap<&'static str, CodeMetadata>> = OnceLock::new();

const REGISTRY_ENTRIES: &[CodeMetadata] = &[
    // System
    CodeMetadata::new("ERR001", "System", Severity::Critical, false, "Critical internal error"),
    CodeMetadata::new("ERR003", "System", Severity::High, false, "Invalid configuration"),
    // Lexical
    CodeMetadata::new("E020", "Lexical", Severity::High, false, "Invalid character in rule source"),
    CodeMetadata::new("E021", "Lexical", Severity::High, false, "Unterminated string literal"),
    CodeMetadata::new("E022", "Lexical", Severity::High, false, "Invalid number literal"),
    CodeMetadata::new("E023", "Lexical", Severity::Medium, false, "Identifier exceeds length limit"),
    CodeMetadata::new("E024", "Lexical", Severity::Medium, false, "String literal exceeds size limit"),
    CodeMetadata::new("E025", "Lexical", Severity::High, false, "Unterminated block comment"),
    CodeMetadata::new("E026", "Lexical", Severity::High, false, "Unterminated regular expression"),
    CodeMetadata::new("E027", "Lexical", Severity::High, false, "Invalid escape sequence"),
    CodeMetadata::new("E028", "Lexical", Severity::Medium, false, "Rule source exceeds size limit"),
    CodeMetadata::new("E029", "Lexical", Severity::High, false, "Unterminated hex string"),
    // Syntax
    CodeMetadata::new("E040", "Syntax", Severity::High, false, "Unexpected token"),
    CodeMetadata::new("E041", "Syntax", Severity::High, false, "Unexpected end of rule source"),
    CodeMetadata::new("E042", "Syntax", Severity::High, false, "Condition nesting too deep"),
    CodeMetadata::new("E043", "Syntax", Severity::High, false, "Grammar violation"),
    // Validation
    CodeMetadata::new("E060", "Validation", Severity::High, false, "Duplicate rule identifier"),
    CodeMetadata::new("E061", "Validation", Severity::High, false, "Duplicate string identifier"),
    CodeMetadata::new("E062", "Validation", Severity::High, false, "Undefined string identifier"),
    CodeMetadata::new("E063", "Validation", Severity::High, false, "Undefined rule identifier"),
    CodeMetadata::new("E064", "Validation", Severity::Medium, false, "String declared but never used"),
    CodeMetadata::new("E065", "Validation", Severity::High, false, "Invalid hex string"),
    CodeMetadata::new("E066", "Validation", Severity::High, false, "Invalid regular expression"),
    CodeMetadata::new("E067", "Validation", Severity::Medium, false, "Implementation limit exceeded"),
    CodeMetadata::new("E068", "Validation", Severity::High, false, "Rule has no condition"),
    CodeMetadata::new("E069", "Validation", Severity::Medium, false, "Modifier not valid for string"),
    CodeMetadata::new("E070", "Validation", Severity::High, false, "Operand has the wrong type"),
    CodeMetadata::new("E071", "Validation", Severity::Medium, false, "Empty string pattern"),
    // Archive
    CodeMetadata::new("E100", "Archive", Severity::High, false, "Archive path does not exist"),
    CodeMetadata::new("E101", "Archive", Severity::High, false, "Archive container cannot be parsed"),
    CodeMetadata::new("E102", "Archive", Severity::Medium, true, "Archive entry could not be read"),
    CodeMetadata::new("E103", "Archive", Severity::Medium, true, "Archive entry exceeds size limit"),
    CodeMetadata::new("E104", "Archive", Severity::High, false, "Archive entry path escapes the archive"),
    CodeMetadata::new("W100", "Archive", Severity::Low, true, "Undecodable bytes replaced"),
    // Scanner
    CodeMetadata::new("E120", "Scanner", Severity::High, true, "Scan target artifact missing"),
    CodeMetadata::new("E121", "Scanner", Severity::High, true, "Remote scanner unavailable"),
    CodeMetadata::new("E122", "Scanner", Severity::High, true, "Remote scanner returned an error"),
    CodeMetadata::new("E123", "Scanner", Severity::High, true, "Rule compilation failed"),
    CodeMetadata::new("E124", "Scanner", Severity::High, true, "Persistence layer failure"),
    CodeMetadata::new("E125", "Scanner", Severity::High, true, "Follow-up action failed"),
    CodeMetadata::new("W120", "Scanner", Severity::Medium, true, "Invalid rule skipped"),
];

fn get_code_registry() -> &'static HashMap<&'static str, CodeMetadata> {
    CODE_REGISTRY.get_or_init(|| {
        REGISTRY_ENTRIES
            .iter()
            .map(|metadata| (metadata.code, metadata.clone()))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_code_metadata(code: &str) -> Option<&'static CodeMetadata> {
    get_code_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_code_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_code_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn get_description(code: &str) -> &'static str {
    get_code_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_category(code: &str) -> &'static str {
    get_code_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
