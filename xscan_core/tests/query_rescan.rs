mod common;

use assert_matches::assert_matches;
use common::*;
use std::sync::Arc;
use tempfile::TempDir;
use xscan_core::metrics;
use xscan_core::prelude::*;

struct Harness {
    store: Arc<MemoryStore>,
    metrics: Arc<MemoryMetrics>,
    dispatcher: Arc<RecordingDispatcher>,
    rescanner: QueryRescanner,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MemoryMetrics::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let rescanner = QueryRescanner::new(
            store.clone(),
            metrics.clone(),
            dispatcher.clone(),
            ArchiveLimits::default(),
        );
        Self {
            store,
            metrics,
            dispatcher,
            rescanner,
            dir: TempDir::new().unwrap(),
        }
    }

    fn query_rule(&self, id: u64, definition: &str, action: RuleAction) {
        self.store.add_query_rule(QueryRule {
            rule: yara_rule(id, &format!("query_{}", id), definition),
            action,
        });
    }

    fn version(&self, id: u64, entries: &[(&str, &[u8])]) -> PublishedVersion {
        let file_path = write_zip(self.dir.path(), &format!("version-{}.xpi", id), entries);
        let version = PublishedVersion {
            id,
            addon_id: 1000 + id,
            file_path,
        };
        self.store.add_version(version.clone());
        version
    }
}

const TRACKER_RULE: &str = r#"
rule tracker : privacy {
    strings:
        $beacon = "navigator.sendBeacon"
    condition:
        $beacon
}
"#;

#[test]
fn test_match_stores_result_and_dispatches_action_once() {
    let harness = Harness::new();
    harness.query_rule(1, TRACKER_RULE, RuleAction::FlagForHumanReview);
    harness.version(
        5,
        &[
            ("bg.js", b"navigator.sendBeacon(url, data);"),
            ("popup.js", b"navigator.sendBeacon(other);"),
        ],
    );

    let outcome = harness.rescanner.run_with_outcome(1, 5);

    let result = outcome.result().expect("query result stored");
    assert!(result.has_matches());
    assert_eq!(result.version_id, 5);
    assert_eq!(result.query_rule_id, 1);
    assert_eq!(result.scanner, ScannerKind::Yara);
    assert_eq!(result.matches.len(), 2);

    assert_eq!(
        harness.dispatcher.dispatched(),
        vec![(RuleAction::FlagForHumanReview, 5)]
    );
    assert_eq!(harness.store.query_result_count(), 1);
    assert_eq!(harness.metrics.count(metrics::QUERY_SUCCESS), 1);
    assert_eq!(harness.metrics.timing_count("devhub.yara"), 1);
}

#[test]
fn test_no_match_stores_result_without_action() {
    let harness = Harness::new();
    harness.query_rule(2, TRACKER_RULE, RuleAction::DelayAutoApproval);
    harness.version(6, &[("bg.js", b"console.log('clean');")]);

    let outcome = harness.rescanner.run_with_outcome(2, 6);

    let result = outcome.result().unwrap();
    assert!(!result.has_matches());
    assert!(harness.dispatcher.dispatched().is_empty());
    assert_eq!(harness.store.query_result_count(), 1);
}

#[test]
fn test_invalid_definition_counts_failure() {
    let harness = Harness::new();
    harness.query_rule(3, "rule broken { condition: $missing }", RuleAction::NoAction);
    harness.version(7, &[("bg.js", b"x")]);

    let outcome = harness.rescanner.run_with_outcome(3, 7);

    assert_matches!(outcome.error(), Some(ScanError::RuleCompilation(_)));
    assert_eq!(harness.store.query_result_count(), 0);
    assert_eq!(harness.metrics.count(metrics::QUERY_FAILURE), 1);
    assert!(harness.dispatcher.dispatched().is_empty());
}

#[test]
fn test_unknown_version_is_store_error() {
    let harness = Harness::new();
    harness.query_rule(4, TRACKER_RULE, RuleAction::NoAction);

    let outcome = harness.rescanner.run_with_outcome(4, 404);

    assert_matches!(
        outcome.error(),
        Some(ScanError::Store(StoreError::NotFound { id: 404, .. }))
    );
}

#[test]
fn test_missing_version_file_is_target_not_found() {
    let harness = Harness::new();
    harness.query_rule(5, TRACKER_RULE, RuleAction::NoAction);
    let version = harness.version(8, &[("bg.js", b"x")]);
    std::fs::remove_file(&version.file_path).unwrap();

    let outcome = harness.rescanner.run_with_outcome(5, 8);

    assert_matches!(outcome.error(), Some(ScanError::TargetNotFound { .. }));
    assert_eq!(harness.metrics.count(metrics::QUERY_FAILURE), 1);
}
