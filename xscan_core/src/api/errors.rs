//! Scan errors caught at the orchestrator boundary

use crate::actions::ActionError;
use crate::archive::ArchiveError;
use crate::remote::RemoteError;
use crate::store::StoreError;
use std::path::PathBuf;
use xscan_rules::logging::{codes, Code};
use xscan_rules::RuleCompilationError;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("file \"{}\" does not exist", .path.display())]
    TargetNotFound { path: PathBuf },

    #[error("{0}")]
    ScannerUnavailable(RemoteError),

    #[error("{0}")]
    ScannerResponse(RemoteError),

    #[error("rule compilation failed: {0}")]
    RuleCompilation(#[from] RuleCompilationError),

    #[error("{0}")]
    CorruptArchive(ArchiveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl ScanError {
    pub fn error_code(&self) -> Code {
        match self {
            ScanError::TargetNotFound { .. } => codes::scanner::TARGET_NOT_FOUND,
            ScanError::ScannerUnavailable(_) => codes::scanner::SCANNER_UNAVAILABLE,
            ScanError::ScannerResponse(_) => codes::scanner::SCANNER_RESPONSE_ERROR,
            ScanError::RuleCompilation(_) => codes::scanner::RULE_COMPILATION_FAILED,
            ScanError::CorruptArchive(error) => error.error_code(),
            ScanError::Store(error) => error.error_code(),
            ScanError::Action(error) => error.error_code(),
        }
    }

    /// Failures that may succeed when the same scan is scheduled again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScanError::ScannerUnavailable(_) | ScanError::Store(StoreError::Backend { .. })
        )
    }
}

impl From<RemoteError> for ScanError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Unavailable { .. } => ScanError::ScannerUnavailable(error),
            RemoteError::Response { .. } => ScanError::ScannerResponse(error),
        }
    }
}

impl From<ArchiveError> for ScanError {
    fn from(error: ArchiveError) -> Self {
        match error {
            ArchiveError::NotFound { path } => ScanError::TargetNotFound { path },
            other => ScanError::CorruptArchive(other),
        }
    }
}
