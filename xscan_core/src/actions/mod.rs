//! Follow-up actions triggered by matching query rules

use crate::types::{PublishedVersion, RuleAction};
use std::sync::{Mutex, PoisonError};
use xscan_rules::logging::{codes, Code};
use xscan_rules::log_info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action {action} failed for version {version_id}: {reason}")]
pub struct ActionError {
    pub action: RuleAction,
    pub version_id: u64,
    pub reason: String,
}

impl ActionError {
    pub fn error_code(&self) -> Code {
        codes::scanner::ACTION_FAILURE
    }
}

pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, action: RuleAction, version: &PublishedVersion) -> Result<(), ActionError>;
}

/// Records every dispatched action; used by tests and the CLI
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    dispatched: Mutex<Vec<(RuleAction, u64)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(action, version id)` pairs in dispatch order
    pub fn dispatched(&self) -> Vec<(RuleAction, u64)> {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, action: RuleAction, version: &PublishedVersion) -> Result<(), ActionError> {
        log_info!("Recording rule action",
            "action" => action,
            "version" => version.id,
            "addon" => version.addon_id
        );
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((action, version.id));
        Ok(())
    }
}
