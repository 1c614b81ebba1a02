// ============================================================================
// SCANNER KINDS AND RULES
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Fixed set of scanners a package can be submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// Remote classifier returning a `matchedRules` list
    Customs,
    /// Remote classifier without rule names
    Wat,
    /// Local pattern rule engine
    Yara,
}

impl ScannerKind {
    pub const ALL: [ScannerKind; 3] = [ScannerKind::Customs, ScannerKind::Wat, ScannerKind::Yara];

    /// Name used in metric names and log context
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerKind::Customs => "customs",
            ScannerKind::Wat => "wat",
            ScannerKind::Yara => "yara",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, ScannerKind::Yara)
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded package awaiting admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub id: u64,
    pub path: PathBuf,
    pub is_webextension: bool,
    /// Identifies the upload in authenticated download URLs
    pub uuid: Uuid,
}

impl ScanTarget {
    pub fn new(id: u64, path: impl Into<PathBuf>, is_webextension: bool) -> Self {
        Self {
            id,
            path: path.into(),
            is_webextension,
            uuid: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: u64,
    pub name: String,
    pub scanner: ScannerKind,
    /// Pattern rule source; only meaningful for [`ScannerKind::Yara`]
    pub definition: Option<String>,
    pub is_active: bool,
}

impl RuleDefinition {
    /// Rule body to compile, if this rule takes part in compilation
    pub fn compilable_source(&self) -> Option<&str> {
        if !self.is_active {
            return None;
        }
        self.definition
            .as_deref()
            .filter(|source| !source.trim().is_empty())
    }
}

/// Active rules of one scanner kind, read fresh for every scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub kind: ScannerKind,
    pub rules: Vec<RuleDefinition>,
}

impl RuleSnapshot {
    pub fn new(kind: ScannerKind, rules: Vec<RuleDefinition>) -> Self {
        Self { kind, rules }
    }

    /// Rules with a non-empty active body, in store order
    pub fn compilable(&self) -> impl Iterator<Item = (&RuleDefinition, &str)> {
        self.rules
            .iter()
            .filter(|rule| rule.scanner == self.kind)
            .filter_map(|rule| rule.compilable_source().map(|source| (rule, source)))
    }

    /// Every compilable body joined with newlines
    pub fn joined_source(&self) -> String {
        self.compilable()
            .map(|(_, source)| source)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// QUERY RULES
// ============================================================================

/// Follow-up taken on a published version when a query rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    #[default]
    NoAction,
    FlagForHumanReview,
    DelayAutoApproval,
    DelayAutoApprovalIndefinitely,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::NoAction => "no_action",
            RuleAction::FlagForHumanReview => "flag_for_human_review",
            RuleAction::DelayAutoApproval => "delay_auto_approval",
            RuleAction::DelayAutoApprovalIndefinitely => "delay_auto_approval_indefinitely",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        [
            RuleAction::NoAction,
            RuleAction::FlagForHumanReview,
            RuleAction::DelayAutoApproval,
            RuleAction::DelayAutoApprovalIndefinitely,
        ]
        .into_iter()
        .find(|action| action.as_str() == name.replace('-', "_"))
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern rule run against already published versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRule {
    pub rule: RuleDefinition,
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedVersion {
    pub id: u64,
    pub addon_id: u64,
    /// Current path of the version's primary file
    pub file_path: PathBuf,
}

// ============================================================================
// VALIDATION PAYLOAD
// ============================================================================

/// Upstream validation results threaded through every submission-time scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationPayload(pub serde_json::Value);

impl ValidationPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Webextension determination made by the validation pipeline, if present
    pub fn is_webextension(&self) -> Option<bool> {
        self.0
            .pointer("/metadata/is_webextension")
            .and_then(serde_json::Value::as_bool)
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(id: u64, definition: Option<&str>, is_active: bool) -> RuleDefinition {
        RuleDefinition {
            id,
            name: format!("rule_{}", id),
            scanner: ScannerKind::Yara,
            definition: definition.map(str::to_string),
            is_active,
        }
    }

    #[test]
    fn test_snapshot_excludes_inactive_and_empty_rules() {
        let snapshot = RuleSnapshot::new(
            ScannerKind::Yara,
            vec![
                rule(1, Some("rule a { condition: true }"), true),
                rule(2, Some("rule b { condition: true }"), false),
                rule(3, None, true),
                rule(4, Some("   "), true),
                rule(5, Some("rule e { condition: false }"), true),
            ],
        );
        let ids: Vec<u64> = snapshot.compilable().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(
            snapshot.joined_source(),
            "rule a { condition: true }\nrule e { condition: false }"
        );
    }

    #[test]
    fn test_payload_webextension_flag() {
        let yes = ValidationPayload::new(json!({"metadata": {"is_webextension": true}}));
        let no = ValidationPayload::new(json!({"metadata": {"is_webextension": false}}));
        let absent = ValidationPayload::new(json!({"errors": 0}));
        assert_eq!(yes.is_webextension(), Some(true));
        assert_eq!(no.is_webextension(), Some(false));
        assert_eq!(absent.is_webextension(), None);
    }

    #[test]
    fn test_kind_and_action_names() {
        assert_eq!(ScannerKind::parse("YARA"), Some(ScannerKind::Yara));
        assert_eq!(ScannerKind::Customs.to_string(), "customs");
        assert!(ScannerKind::Wat.is_remote());
        assert_eq!(
            RuleAction::parse("delay-auto-approval"),
            Some(RuleAction::DelayAutoApproval)
        );
        assert_eq!(RuleAction::parse("unknown"), None);
    }
}
