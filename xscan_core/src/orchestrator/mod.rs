//! Submission-time scan orchestration
//!
//! One invocation handles one (upload, scanner) pair:
//! `GateCheck -> Running -> Stored | Skipped | Failed`. Whatever happens,
//! the validation payload is handed back unchanged and no error escapes.

pub mod query;

pub use query::{QueryOutcome, QueryRescanner};

use crate::api::errors::ScanError;
use crate::metrics::{self, MetricsSink};
use crate::scanner::Scanner;
use crate::store::ScanStore;
use crate::types::{ScanResult, ValidationPayload};
use std::fmt;
use std::sync::Arc;
use xscan_rules::logging::{codes, with_scan_context};
use xscan_rules::{log_debug, log_error, log_info, log_success};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    GateCheck,
    Running,
    Stored,
    Skipped,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::GateCheck => "gate_check",
            ScanState::Running => "running",
            ScanState::Stored => "stored",
            ScanState::Skipped => "skipped",
            ScanState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal state of one orchestrated scan
#[derive(Debug)]
pub enum ScanOutcome {
    Stored(ScanResult),
    Skipped,
    Failed(ScanError),
}

impl ScanOutcome {
    pub fn state(&self) -> ScanState {
        match self {
            ScanOutcome::Stored(_) => ScanState::Stored,
            ScanOutcome::Skipped => ScanState::Skipped,
            ScanOutcome::Failed(_) => ScanState::Failed,
        }
    }

    pub fn result(&self) -> Option<&ScanResult> {
        match self {
            ScanOutcome::Stored(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            ScanOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

pub struct ScanOrchestrator {
    store: Arc<dyn ScanStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl ScanOrchestrator {
    pub fn new(store: Arc<dyn ScanStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { store, metrics }
    }

    /// Scan and return `payload` verbatim
    pub fn run(
        &self,
        scanner: &dyn Scanner,
        payload: ValidationPayload,
        upload_id: u64,
    ) -> ValidationPayload {
        self.run_with_outcome(scanner, &payload, upload_id);
        payload
    }

    pub fn run_with_outcome(
        &self,
        scanner: &dyn Scanner,
        payload: &ValidationPayload,
        upload_id: u64,
    ) -> ScanOutcome {
        let kind = scanner.kind();
        with_scan_context(kind.as_str(), upload_id, || {
            log_info!("Starting scanner task", "state" => ScanState::GateCheck);

            let gate = payload.is_webextension();
            if gate == Some(false) {
                return skipped("validation marked the upload as not a webextension");
            }

            match self.execute(scanner, upload_id, gate) {
                Ok(Some(result)) => {
                    log_success!(codes::success::SCAN_RESULT_STORED, "Ending scanner task",
                        "state" => ScanState::Stored,
                        "has_matches" => result.has_matches(),
                        "matched_rules" => result.matched_rules.len()
                    );
                    ScanOutcome::Stored(result)
                }
                Ok(None) => skipped("upload is not a webextension"),
                Err(error) => {
                    self.metrics
                        .incr(&metrics::scanner_counter(kind, "failure"));
                    log_error!(error.error_code(), "Error in scanner task",
                        "state" => ScanState::Failed,
                        "error" => error,
                        "transient" => error.is_transient()
                    );
                    ScanOutcome::Failed(error)
                }
            }
        })
    }

    /// `Ok(None)` when the upload's own flag closes the gate
    fn execute(
        &self,
        scanner: &dyn Scanner,
        upload_id: u64,
        gate: Option<bool>,
    ) -> Result<Option<ScanResult>, ScanError> {
        let kind = scanner.kind();
        let target = self.store.upload(upload_id)?;
        if gate.is_none() && !target.is_webextension {
            return Ok(None);
        }

        log_debug!("Scanner running", "state" => ScanState::Running);
        if !target.path.exists() {
            return Err(ScanError::TargetNotFound { path: target.path });
        }

        let snapshot = self.store.active_rules(kind)?;
        let payload = metrics::timed(self.metrics.as_ref(), &metrics::scanner_timer(kind), || {
            scanner.run(&target, &snapshot)
        })?;

        let known_rules = self.store.rules(kind)?;
        let result = ScanResult::new(upload_id, kind, payload, &known_rules);
        self.store.create_scan_result(result.clone())?;

        if result.has_matches() {
            self.metrics
                .incr(&metrics::scanner_counter(kind, "has_matches"));
            for rule_id in &result.matched_rules {
                self.metrics
                    .incr(&metrics::rule_match_counter(kind, *rule_id));
            }
        }
        self.metrics.incr(&metrics::scanner_counter(kind, "success"));
        Ok(Some(result))
    }
}

fn skipped(reason: &str) -> ScanOutcome {
    log_success!(codes::success::SCAN_SKIPPED, "Not running scanner",
        "state" => ScanState::Skipped,
        "reason" => reason
    );
    ScanOutcome::Skipped
}
