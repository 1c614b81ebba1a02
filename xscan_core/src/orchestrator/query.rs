//! Re-scanning published versions with a single query rule

use crate::actions::ActionDispatcher;
use crate::api::errors::ScanError;
use crate::archive::ArchiveLimits;
use crate::metrics::{self, MetricsSink};
use crate::results::scan_archive_path;
use crate::store::ScanStore;
use crate::types::{QueryResult, ScannerKind};
use std::sync::Arc;
use xscan_rules::logging::{codes, with_scan_context};
use xscan_rules::{compile, log_error, log_info, log_success};

#[derive(Debug)]
pub enum QueryOutcome {
    Stored(QueryResult),
    Failed(ScanError),
}

impl QueryOutcome {
    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            QueryOutcome::Stored(result) => Some(result),
            QueryOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            QueryOutcome::Failed(error) => Some(error),
            QueryOutcome::Stored(_) => None,
        }
    }
}

pub struct QueryRescanner {
    store: Arc<dyn ScanStore>,
    metrics: Arc<dyn MetricsSink>,
    dispatcher: Arc<dyn ActionDispatcher>,
    limits: ArchiveLimits,
}

impl QueryRescanner {
    pub fn new(
        store: Arc<dyn ScanStore>,
        metrics: Arc<dyn MetricsSink>,
        dispatcher: Arc<dyn ActionDispatcher>,
        limits: ArchiveLimits,
    ) -> Self {
        Self {
            store,
            metrics,
            dispatcher,
            limits,
        }
    }

    pub fn run(&self, query_rule_id: u64, version_id: u64) {
        self.run_with_outcome(query_rule_id, version_id);
    }

    pub fn run_with_outcome(&self, query_rule_id: u64, version_id: u64) -> QueryOutcome {
        with_scan_context(ScannerKind::Yara.as_str(), format!("version:{}", version_id), || {
            log_info!("Starting query rule task", "query_rule" => query_rule_id);

            match self.execute(query_rule_id, version_id) {
                Ok(result) => {
                    self.metrics.incr(metrics::QUERY_SUCCESS);
                    QueryOutcome::Stored(result)
                }
                Err(error) => {
                    self.metrics.incr(metrics::QUERY_FAILURE);
                    log_error!(error.error_code(), "Error in query rule task",
                        "query_rule" => query_rule_id,
                        "error" => error,
                        "transient" => error.is_transient()
                    );
                    QueryOutcome::Failed(error)
                }
            }
        })
    }

    fn execute(&self, query_rule_id: u64, version_id: u64) -> Result<QueryResult, ScanError> {
        let query_rule = self.store.query_rule(query_rule_id)?;
        let version = self.store.version(version_id)?;

        let matches = metrics::timed(
            self.metrics.as_ref(),
            &metrics::scanner_timer(ScannerKind::Yara),
            || -> Result<_, ScanError> {
                let compiled = compile(query_rule.rule.definition.as_deref().unwrap_or_default())?;
                if !version.file_path.exists() {
                    return Err(ScanError::TargetNotFound {
                        path: version.file_path.clone(),
                    });
                }
                let (matches, _summary) = scan_archive_path(&compiled, &version.file_path, self.limits)?;
                Ok(matches)
            },
        )?;

        let result = QueryResult::new(version.id, query_rule.rule.id, matches);
        self.store.create_query_result(result.clone())?;
        log_success!(codes::success::QUERY_RESULT_STORED, "Query result stored",
            "query_rule" => query_rule.rule.id,
            "matches" => result.matches.len()
        );

        if result.has_matches() {
            self.dispatcher.dispatch(query_rule.action, &version)?;
            log_success!(codes::success::ACTION_DISPATCHED, "Rule action dispatched",
                "action" => query_rule.action,
                "version" => version.id
            );
        }
        Ok(result)
    }
}
