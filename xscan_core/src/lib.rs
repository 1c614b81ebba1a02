//! # Extension package scanning
//!
//! Runs remote classifiers and the local pattern rule engine against
//! uploaded packages, and re-runs single query rules against published
//! versions. Storage, metrics backends and follow-up actions are reached
//! through the traits in [`store`], [`metrics`] and [`actions`].

pub mod actions;
pub mod api;
pub mod archive;
pub mod metrics;
pub mod orchestrator;
pub mod remote;
pub mod results;
pub mod scanner;
pub mod store;
pub mod types;

pub use api::*;

pub mod prelude {
    pub use crate::actions::{ActionDispatcher, ActionError, RecordingDispatcher};
    pub use crate::api::{CompilationPolicy, ScanError, ScanTasks, ScannerSettings};
    pub use crate::archive::{ArchiveError, ArchiveLimits, ArchiveReader};
    pub use crate::metrics::{LoggingMetrics, MemoryMetrics, MetricsSink};
    pub use crate::orchestrator::{
        QueryOutcome, QueryRescanner, ScanOrchestrator, ScanOutcome, ScanState,
    };
    pub use crate::remote::{RemoteError, RemoteScannerClient};
    pub use crate::results::{AggregationSummary, ScanResultAggregator};
    pub use crate::scanner::{
        DownloadUrlSigner, PatternScanner, RemoteScanner, Scanner, SiteUrlSigner,
    };
    pub use crate::store::{MemoryStore, ScanStore, StoreError};
    pub use crate::types::{
        MatchRecord, PublishedVersion, QueryResult, QueryRule, ResultPayload, RuleAction,
        RuleDefinition, RuleSnapshot, ScanResult, ScanTarget, ScannerKind, ValidationPayload,
    };
}
