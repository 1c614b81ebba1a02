//! Scanner variants dispatched by the orchestrator
//!
//! A scanner turns one target plus the current rule snapshot into a result
//! payload. Persistence, metrics and failure handling belong to the caller.

pub mod pattern;
pub mod remote;

pub use pattern::PatternScanner;
pub use remote::RemoteScanner;

use crate::api::errors::ScanError;
use crate::types::{ResultPayload, RuleSnapshot, ScanTarget, ScannerKind};

pub trait Scanner: Send + Sync {
    fn kind(&self) -> ScannerKind;

    fn run(&self, target: &ScanTarget, rules: &RuleSnapshot) -> Result<ResultPayload, ScanError>;
}

/// Produces the time-limited authenticated URL a remote scanner downloads from
pub trait DownloadUrlSigner: Send + Sync {
    fn download_url(&self, target: &ScanTarget) -> String;
}

/// Builds `<site>/uploads/file/<uuid>` URLs without signing
#[derive(Debug, Clone)]
pub struct SiteUrlSigner {
    site_url: String,
}

impl SiteUrlSigner {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
        }
    }
}

impl DownloadUrlSigner for SiteUrlSigner {
    fn download_url(&self, target: &ScanTarget) -> String {
        format!(
            "{}/uploads/file/{}",
            self.site_url.trim_end_matches('/'),
            target.uuid.simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_url_signer() {
        let target = ScanTarget::new(1, "/tmp/x.zip", true);
        let url = SiteUrlSigner::new("https://addons.example/").download_url(&target);
        assert_eq!(
            url,
            format!("https://addons.example/uploads/file/{}", target.uuid.simple())
        );
    }
}
