//! # Scheduler Entry Points
//!
//! One method per scheduled task. Submission-time tasks take the upstream
//! validation payload and return it unchanged.

use crate::actions::ActionDispatcher;
use crate::api::config::ScannerSettings;
use crate::metrics::MetricsSink;
use crate::orchestrator::{QueryRescanner, ScanOrchestrator};
use crate::scanner::{DownloadUrlSigner, PatternScanner, RemoteScanner};
use crate::store::ScanStore;
use crate::types::{ScannerKind, ValidationPayload};
use std::sync::Arc;

pub struct ScanTasks {
    orchestrator: ScanOrchestrator,
    query: QueryRescanner,
    customs: RemoteScanner,
    wat: RemoteScanner,
    yara: PatternScanner,
}

impl ScanTasks {
    pub fn new(
        settings: &ScannerSettings,
        store: Arc<dyn ScanStore>,
        metrics: Arc<dyn MetricsSink>,
        dispatcher: Arc<dyn ActionDispatcher>,
        signer: Arc<dyn DownloadUrlSigner>,
    ) -> Self {
        let timeout = settings.timeout();
        Self {
            orchestrator: ScanOrchestrator::new(store.clone(), metrics.clone()),
            query: QueryRescanner::new(store, metrics, dispatcher, settings.archive),
            customs: RemoteScanner::new(
                ScannerKind::Customs,
                &settings.customs,
                timeout,
                signer.clone(),
            ),
            wat: RemoteScanner::new(ScannerKind::Wat, &settings.wat, timeout, signer),
            yara: PatternScanner::new(settings.compilation_policy, settings.archive),
        }
    }

    pub fn run_customs(&self, payload: ValidationPayload, upload_id: u64) -> ValidationPayload {
        self.orchestrator.run(&self.customs, payload, upload_id)
    }

    pub fn run_wat(&self, payload: ValidationPayload, upload_id: u64) -> ValidationPayload {
        self.orchestrator.run(&self.wat, payload, upload_id)
    }

    pub fn run_yara(&self, payload: ValidationPayload, upload_id: u64) -> ValidationPayload {
        self.orchestrator.run(&self.yara, payload, upload_id)
    }

    pub fn run_yara_query_rule_on_version(&self, query_rule_id: u64, version_id: u64) {
        self.query.run(query_rule_id, version_id)
    }
}
