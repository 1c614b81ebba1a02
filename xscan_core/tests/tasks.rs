mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use xscan_core::prelude::*;
use xscan_core::RemoteEndpoint;

struct Tasks {
    store: Arc<MemoryStore>,
    metrics: Arc<MemoryMetrics>,
    dispatcher: Arc<RecordingDispatcher>,
    tasks: ScanTasks,
}

fn tasks(settings: ScannerSettings) -> Tasks {
    let store = Arc::new(MemoryStore::new());
    let metrics = Arc::new(MemoryMetrics::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let tasks = ScanTasks::new(
        &settings,
        store.clone(),
        metrics.clone(),
        dispatcher.clone(),
        Arc::new(SiteUrlSigner::new(settings.site_url.clone())),
    );
    Tasks {
        store,
        metrics,
        dispatcher,
        tasks,
    }
}

fn endpoint(api_url: String) -> RemoteEndpoint {
    RemoteEndpoint {
        api_url,
        api_key: "key".into(),
    }
}

#[test]
fn test_customs_timeout_hands_payload_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let (url, _requests) = serve_once(StubReply::Hang(Duration::from_secs(5)));
    let settings = ScannerSettings {
        customs: endpoint(url),
        ..ScannerSettings::default()
    }
    .with_timeout(Duration::from_secs(1));
    let t = tasks(settings);
    t.store.add_upload(ScanTarget::new(
        1,
        write_zip(dir.path(), "a.xpi", &[("a.js", b"x")]),
        true,
    ));

    let payload = webextension_payload();
    let returned = t.tasks.run_customs(payload.clone(), 1);

    assert_eq!(returned, payload);
    assert_eq!(t.metrics.count("devhub.customs.failure"), 1);
    assert_eq!(t.metrics.count("devhub.customs.success"), 0);
    assert_eq!(t.store.scan_result_count(), 0);
}

#[test]
fn test_wat_without_endpoint_fails_and_returns_payload() {
    let dir = TempDir::new().unwrap();
    let settings = ScannerSettings {
        wat: endpoint(String::new()),
        ..ScannerSettings::default()
    };
    let t = tasks(settings);
    t.store.add_upload(ScanTarget::new(
        2,
        write_zip(dir.path(), "b.xpi", &[("a.js", b"x")]),
        true,
    ));

    let payload = webextension_payload();
    assert_eq!(t.tasks.run_wat(payload.clone(), 2), payload);
    assert_eq!(t.metrics.count("devhub.wat.failure"), 1);
    assert_eq!(t.store.scan_result_count(), 0);
}

#[test]
fn test_yara_and_query_tasks_share_the_store() {
    let dir = TempDir::new().unwrap();
    let t = tasks(ScannerSettings::default());
    let archive = write_zip(dir.path(), "c.xpi", &[("bg.js", b"eval(atob('x'))")]);
    let rule = r#"rule eval_atob { strings: $a = "eval(atob(" condition: $a }"#;

    t.store.add_upload(ScanTarget::new(3, archive.clone(), true));
    t.store.add_rule(yara_rule(1, "eval_atob", rule));
    t.store.add_query_rule(QueryRule {
        rule: yara_rule(9, "eval_atob", rule),
        action: RuleAction::FlagForHumanReview,
    });
    t.store.add_version(PublishedVersion {
        id: 40,
        addon_id: 4,
        file_path: archive,
    });

    let payload = webextension_payload();
    assert_eq!(t.tasks.run_yara(payload.clone(), 3), payload);
    t.tasks.run_yara_query_rule_on_version(9, 40);

    assert_eq!(t.store.scan_result_count(), 1);
    assert_eq!(t.metrics.count("devhub.yara.has_matches"), 1);
    assert_eq!(t.store.query_result_count(), 1);
    assert_eq!(
        t.dispatcher.dispatched(),
        vec![(RuleAction::FlagForHumanReview, 40)]
    );
}
