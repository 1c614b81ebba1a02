use super::{DownloadUrlSigner, Scanner};
use crate::api::config::RemoteEndpoint;
use crate::api::errors::ScanError;
use crate::remote::{RemoteError, RemoteScannerClient};
use crate::types::{ResultPayload, RuleSnapshot, ScanTarget, ScannerKind};
use std::sync::Arc;
use std::time::Duration;
use xscan_rules::log_info;

/// RPC classifier: posts the download URL and stores the raw JSON answer
pub struct RemoteScanner {
    kind: ScannerKind,
    endpoint: RemoteEndpoint,
    client: RemoteScannerClient,
    signer: Arc<dyn DownloadUrlSigner>,
}

impl RemoteScanner {
    pub fn new(
        kind: ScannerKind,
        endpoint: &RemoteEndpoint,
        timeout: Duration,
        signer: Arc<dyn DownloadUrlSigner>,
    ) -> Self {
        Self {
            kind,
            endpoint: endpoint.clone(),
            client: RemoteScannerClient::new(timeout),
            signer,
        }
    }
}

impl Scanner for RemoteScanner {
    fn kind(&self) -> ScannerKind {
        self.kind
    }

    /// Remote scanners keep their rules server-side; the snapshot is unused
    fn run(&self, target: &ScanTarget, _rules: &RuleSnapshot) -> Result<ResultPayload, ScanError> {
        if !self.endpoint.is_configured() {
            return Err(ScanError::ScannerUnavailable(RemoteError::Unavailable {
                reason: format!("no API URL configured for {}", self.kind),
            }));
        }

        let download_url = self.signer.download_url(target);
        log_info!("Invoking remote scanner", "url" => self.endpoint.api_url);

        let value = self.client.invoke(
            &self.endpoint.api_url,
            &self.endpoint.api_key,
            &download_url,
        )?;
        Ok(ResultPayload::Remote(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SiteUrlSigner;
    use assert_matches::assert_matches;

    #[test]
    fn test_unconfigured_endpoint_is_unavailable() {
        let scanner = RemoteScanner::new(
            ScannerKind::Wat,
            &RemoteEndpoint {
                api_url: String::new(),
                api_key: "key".into(),
            },
            Duration::from_secs(1),
            Arc::new(SiteUrlSigner::new("https://addons.example")),
        );
        let target = ScanTarget::new(1, "/tmp/upload.xpi", true);

        let result = scanner.run(&target, &RuleSnapshot::new(ScannerKind::Wat, Vec::new()));

        assert_matches!(
            result,
            Err(ScanError::ScannerUnavailable(RemoteError::Unavailable { reason }))
                if reason.contains("wat")
        );
    }
}
