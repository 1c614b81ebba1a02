//! Stored scan results
//!
//! `has_matches` is always derived from the payload; no result carries a
//! separately settable flag.

use super::common::{RuleDefinition, ScannerKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;
use xscan_rules::RuleMatch;

/// Meta key that always carries the archive entry name
pub const FILENAME_META_KEY: &str = "filename";

/// One rule match within one archive entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub rule: String,
    pub tags: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
}

impl MatchRecord {
    /// Attach the entry name, replacing any rule-supplied `filename`
    pub fn from_rule_match(rule_match: RuleMatch, entry_name: &str) -> Self {
        let mut meta = rule_match.meta;
        meta.insert(FILENAME_META_KEY.to_string(), entry_name.to_string());
        Self {
            rule: rule_match.rule,
            tags: rule_match.tags,
            meta,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.meta.get(FILENAME_META_KEY).map(String::as_str)
    }
}

/// Raw remote response or the local match list
///
/// Serialised untagged; which variant a stored value maps back to depends on
/// the scanner kind, see [`ResultPayload::from_stored`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Matches(Vec<MatchRecord>),
    Remote(serde_json::Value),
}

impl ResultPayload {
    /// Rebuild a stored payload: remote kinds keep any JSON verbatim
    pub fn from_stored(
        scanner: ScannerKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        if scanner.is_remote() {
            Ok(ResultPayload::Remote(value))
        } else {
            serde_json::from_value(value).map(ResultPayload::Matches)
        }
    }

    /// Distinct rule names present in the payload
    ///
    /// Only `customs` responses name rules, through a top-level
    /// `matchedRules` array of strings.
    pub fn matched_rule_names(&self, scanner: ScannerKind) -> BTreeSet<String> {
        match (self, scanner) {
            (ResultPayload::Matches(matches), _) => {
                matches.iter().map(|m| m.rule.clone()).collect()
            }
            (ResultPayload::Remote(value), ScannerKind::Customs) => value
                .get("matchedRules")
                .and_then(serde_json::Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(serde_json::Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            (ResultPayload::Remote(_), _) => BTreeSet::new(),
        }
    }
}

/// Outcome of one scanner run against one uploaded package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredScanResult")]
pub struct ScanResult {
    pub id: Uuid,
    pub upload_id: u64,
    pub scanner: ScannerKind,
    pub results: ResultPayload,
    /// Ids of known rules named in `results`, resolved at creation
    pub matched_rules: BTreeSet<u64>,
    pub created: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(
        upload_id: u64,
        scanner: ScannerKind,
        results: ResultPayload,
        known_rules: &[RuleDefinition],
    ) -> Self {
        let names = results.matched_rule_names(scanner);
        let matched_rules = known_rules
            .iter()
            .filter(|rule| rule.scanner == scanner && names.contains(&rule.name))
            .map(|rule| rule.id)
            .collect();

        Self {
            id: Uuid::new_v4(),
            upload_id,
            scanner,
            results,
            matched_rules,
            created: Utc::now(),
        }
    }

    pub fn matched_rule_names(&self) -> BTreeSet<String> {
        self.results.matched_rule_names(self.scanner)
    }

    pub fn has_matches(&self) -> bool {
        !self.matched_rule_names().is_empty()
    }
}

#[derive(Deserialize)]
struct StoredScanResult {
    id: Uuid,
    upload_id: u64,
    scanner: ScannerKind,
    results: serde_json::Value,
    matched_rules: BTreeSet<u64>,
    created: DateTime<Utc>,
}

impl TryFrom<StoredScanResult> for ScanResult {
    type Error = serde_json::Error;

    fn try_from(stored: StoredScanResult) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            upload_id: stored.upload_id,
            scanner: stored.scanner,
            results: ResultPayload::from_stored(stored.scanner, stored.results)?,
            matched_rules: stored.matched_rules,
            created: stored.created,
        })
    }
}

/// Outcome of one query rule run against one published version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: Uuid,
    pub version_id: u64,
    pub query_rule_id: u64,
    pub scanner: ScannerKind,
    pub matches: Vec<MatchRecord>,
    pub created: DateTime<Utc>,
}

impl QueryResult {
    pub fn new(version_id: u64, query_rule_id: u64, matches: Vec<MatchRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version_id,
            query_rule_id,
            scanner: ScannerKind::Yara,
            matches,
            created: Utc::now(),
        }
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn known(id: u64, name: &str, scanner: ScannerKind) -> RuleDefinition {
        RuleDefinition {
            id,
            name: name.to_string(),
            scanner,
            definition: None,
            is_active: true,
        }
    }

    #[test]
    fn test_filename_overrides_rule_meta() {
        let rule_match = RuleMatch {
            rule: "r".into(),
            tags: BTreeSet::new(),
            meta: BTreeMap::from([
                ("filename".to_string(), "from-rule".to_string()),
                ("author".to_string(), "x".to_string()),
            ]),
        };
        let record = MatchRecord::from_rule_match(rule_match, "content/script.js");
        assert_eq!(record.filename(), Some("content/script.js"));
        assert_eq!(record.meta.get("author").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_customs_rule_names_resolve_known_rules() {
        let payload = ResultPayload::Remote(json!({"matchedRules": ["alpha", "gamma", 3]}));
        let rules = vec![
            known(1, "alpha", ScannerKind::Customs),
            known(2, "beta", ScannerKind::Customs),
            known(3, "gamma", ScannerKind::Yara),
        ];
        let result = ScanResult::new(10, ScannerKind::Customs, payload, &rules);
        assert!(result.has_matches());
        assert_eq!(result.matched_rules, BTreeSet::from([1]));
        assert_eq!(
            result.matched_rule_names(),
            BTreeSet::from(["alpha".to_string(), "gamma".to_string()])
        );
    }

    #[test]
    fn test_stored_payload_keeps_its_variant() {
        let remote = ScanResult::new(4, ScannerKind::Wat, ResultPayload::Remote(json!([])), &[]);
        let local = ScanResult::new(
            4,
            ScannerKind::Yara,
            ResultPayload::Matches(vec![MatchRecord {
                rule: "r".into(),
                tags: BTreeSet::new(),
                meta: BTreeMap::from([("filename".to_string(), "a.js".to_string())]),
            }]),
            &[],
        );

        for result in [remote, local] {
            let stored = serde_json::to_string(&result).unwrap();
            let loaded: ScanResult = serde_json::from_str(&stored).unwrap();
            assert_eq!(loaded, result);
        }

        let bad = json!({
            "id": Uuid::new_v4(),
            "upload_id": 1,
            "scanner": "yara",
            "results": {"not": "a match list"},
            "matched_rules": [],
            "created": Utc::now(),
        });
        assert!(serde_json::from_value::<ScanResult>(bad).is_err());
    }

    #[test]
    fn test_has_matches_iff_names_present() {
        let empty_customs = ScanResult::new(
            1,
            ScannerKind::Customs,
            ResultPayload::Remote(json!({"matchedRules": []})),
            &[],
        );
        let malformed = ScanResult::new(
            1,
            ScannerKind::Customs,
            ResultPayload::Remote(json!({"matchedRules": "alpha"})),
            &[],
        );
        let wat = ScanResult::new(
            1,
            ScannerKind::Wat,
            ResultPayload::Remote(json!({"matchedRules": ["alpha"]})),
            &[],
        );
        let yara_empty = ScanResult::new(1, ScannerKind::Yara, ResultPayload::Matches(vec![]), &[]);

        for result in [empty_customs, malformed, wat, yara_empty] {
            assert!(!result.has_matches());
            assert!(result.matched_rules.is_empty());
        }

        let query = QueryResult::new(1, 2, vec![]);
        assert!(!query.has_matches());
    }
}
