//! Persistence seam for targets, rules and results
//!
//! The store is append-only for results: scheduling the same scan twice
//! stores two rows.

use crate::types::{
    PublishedVersion, QueryResult, QueryRule, RuleDefinition, RuleSnapshot, ScanResult,
    ScanTarget, ScannerKind,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use xscan_rules::logging::{codes, Code};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: u64 },

    #[error("store backend failure: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    pub fn error_code(&self) -> Code {
        match self {
            StoreError::NotFound { .. } => codes::scanner::TARGET_NOT_FOUND,
            StoreError::Backend { .. } => codes::scanner::STORE_FAILURE,
        }
    }
}

pub trait ScanStore: Send + Sync {
    fn upload(&self, id: u64) -> Result<ScanTarget, StoreError>;

    /// Every known rule of `kind`, active or not
    fn rules(&self, kind: ScannerKind) -> Result<Vec<RuleDefinition>, StoreError>;

    /// Active rules of `kind` as they are right now
    fn active_rules(&self, kind: ScannerKind) -> Result<RuleSnapshot, StoreError> {
        let rules = self
            .rules(kind)?
            .into_iter()
            .filter(|rule| rule.is_active)
            .collect();
        Ok(RuleSnapshot::new(kind, rules))
    }

    fn create_scan_result(&self, result: ScanResult) -> Result<(), StoreError>;

    fn query_rule(&self, id: u64) -> Result<QueryRule, StoreError>;

    fn version(&self, id: u64) -> Result<PublishedVersion, StoreError>;

    fn create_query_result(&self, result: QueryResult) -> Result<(), StoreError>;

    fn scan_results(&self, upload_id: u64) -> Result<Vec<ScanResult>, StoreError>;

    fn query_results(&self, version_id: u64) -> Result<Vec<QueryResult>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    uploads: HashMap<u64, ScanTarget>,
    rules: Vec<RuleDefinition>,
    query_rules: HashMap<u64, QueryRule>,
    versions: HashMap<u64, PublishedVersion>,
    scan_results: Vec<ScanResult>,
    query_results: Vec<QueryResult>,
}

/// In-process store used by tests and the CLI
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_upload(&self, target: ScanTarget) {
        self.lock().uploads.insert(target.id, target);
    }

    /// Rules keep insertion order, which is also compilation order
    pub fn add_rule(&self, rule: RuleDefinition) {
        let mut state = self.lock();
        state.rules.retain(|existing| existing.id != rule.id);
        state.rules.push(rule);
    }

    pub fn set_rule_active(&self, id: u64, is_active: bool) {
        if let Some(rule) = self.lock().rules.iter_mut().find(|rule| rule.id == id) {
            rule.is_active = is_active;
        }
    }

    pub fn add_query_rule(&self, rule: QueryRule) {
        self.lock().query_rules.insert(rule.rule.id, rule);
    }

    pub fn add_version(&self, version: PublishedVersion) {
        self.lock().versions.insert(version.id, version);
    }

    pub fn scan_result_count(&self) -> usize {
        self.lock().scan_results.len()
    }

    pub fn query_result_count(&self) -> usize {
        self.lock().query_results.len()
    }
}

impl ScanStore for MemoryStore {
    fn upload(&self, id: u64) -> Result<ScanTarget, StoreError> {
        self.lock()
            .uploads
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "upload", id })
    }

    fn rules(&self, kind: ScannerKind) -> Result<Vec<RuleDefinition>, StoreError> {
        Ok(self
            .lock()
            .rules
            .iter()
            .filter(|rule| rule.scanner == kind)
            .cloned()
            .collect())
    }

    fn create_scan_result(&self, result: ScanResult) -> Result<(), StoreError> {
        self.lock().scan_results.push(result);
        Ok(())
    }

    fn query_rule(&self, id: u64) -> Result<QueryRule, StoreError> {
        self.lock()
            .query_rules
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "query rule",
                id,
            })
    }

    fn version(&self, id: u64) -> Result<PublishedVersion, StoreError> {
        self.lock()
            .versions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "version",
                id,
            })
    }

    fn create_query_result(&self, result: QueryResult) -> Result<(), StoreError> {
        self.lock().query_results.push(result);
        Ok(())
    }

    fn scan_results(&self, upload_id: u64) -> Result<Vec<ScanResult>, StoreError> {
        Ok(self
            .lock()
            .scan_results
            .iter()
            .filter(|result| result.upload_id == upload_id)
            .cloned()
            .collect())
    }

    fn query_results(&self, version_id: u64) -> Result<Vec<QueryResult>, StoreError> {
        Ok(self
            .lock()
            .query_results
            .iter()
            .filter(|result| result.version_id == version_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn rule(id: u64, kind: ScannerKind, is_active: bool) -> RuleDefinition {
        RuleDefinition {
            id,
            name: format!("r{}", id),
            scanner: kind,
            definition: Some(format!("rule r{} {{ condition: true }}", id)),
            is_active,
        }
    }

    #[test]
    fn test_active_rules_reflect_current_state() {
        let store = MemoryStore::new();
        store.add_rule(rule(1, ScannerKind::Yara, true));
        store.add_rule(rule(2, ScannerKind::Yara, false));
        store.add_rule(rule(3, ScannerKind::Customs, true));

        let ids = |snapshot: RuleSnapshot| snapshot.rules.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(store.active_rules(ScannerKind::Yara).unwrap()), vec![1]);

        store.set_rule_active(2, true);
        assert_eq!(ids(store.active_rules(ScannerKind::Yara).unwrap()), vec![1, 2]);
        assert_eq!(store.rules(ScannerKind::Customs).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_entities() {
        let store = MemoryStore::new();
        assert_matches!(store.upload(4), Err(StoreError::NotFound { entity: "upload", id: 4 }));
        assert_matches!(store.version(5), Err(StoreError::NotFound { .. }));
        assert_matches!(store.query_rule(6), Err(StoreError::NotFound { .. }));
    }
}
