mod common;

use common::*;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use xscan_core::prelude::*;
use xscan_rules::logging::{
    codes, init_global_logging_with_service, service::create_test_service, LogLevel, MemoryLogger,
};

/// The global logger is process-wide, so every test here shares one capture
fn captured() -> Arc<MemoryLogger> {
    static MEMORY: OnceLock<Arc<MemoryLogger>> = OnceLock::new();
    MEMORY
        .get_or_init(|| {
            let (service, memory) = create_test_service(LogLevel::Debug);
            init_global_logging_with_service(Arc::new(service)).unwrap();
            memory
        })
        .clone()
}

#[test]
fn test_events_carry_scanner_and_target() {
    let memory = captured();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let path = write_zip(dir.path(), "a.xpi", &[("a.js", b"x")]);
    store.add_upload(ScanTarget::new(31, path, true));
    let orchestrator = ScanOrchestrator::new(store, Arc::new(MemoryMetrics::new()));
    let scanner = PatternScanner::default();

    orchestrator.run(&scanner, webextension_payload(), 31);

    let events = memory.get_events_with_context("target", "31");
    assert!(!events.is_empty());
    assert!(events
        .iter()
        .all(|e| e.context.get("scanner").map(String::as_str) == Some("yara")));
    assert!(events
        .iter()
        .any(|e| e.code == codes::success::SCAN_RESULT_STORED));
}

#[test]
fn test_failure_is_logged_with_its_code() {
    let memory = captured();
    let store = Arc::new(MemoryStore::new());
    store.add_upload(ScanTarget::new(32, "/nonexistent/upload.xpi", true));
    let orchestrator = ScanOrchestrator::new(store, Arc::new(MemoryMetrics::new()));

    orchestrator.run(&PatternScanner::default(), webextension_payload(), 32);

    let failures: Vec<_> = memory
        .get_events_with_context("target", "32")
        .into_iter()
        .filter(|e| e.is_error())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].code, codes::scanner::TARGET_NOT_FOUND);
    assert_eq!(
        failures[0].context.get("state").map(String::as_str),
        Some("failed")
    );
}

#[test]
fn test_gate_skip_is_logged() {
    let memory = captured();
    let orchestrator = ScanOrchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryMetrics::new()),
    );
    let payload = ValidationPayload::new(serde_json::json!({
        "metadata": {"is_webextension": false}
    }));

    orchestrator.run(&PatternScanner::default(), payload, 33);

    let skipped = memory.get_events_with_context("target", "33");
    assert!(skipped
        .iter()
        .any(|e| e.code == codes::success::SCAN_SKIPPED));
}
