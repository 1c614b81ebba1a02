//! Blocking RPC client for remote classifiers

pub mod error;

pub use error::RemoteError;

use serde_json::{json, Value};
use std::time::Duration;
use xscan_rules::log_debug;

/// Single-shot client; every call makes exactly one request and never retries
#[derive(Debug, Clone)]
pub struct RemoteScannerClient {
    timeout: Duration,
}

impl RemoteScannerClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn invoke(
        &self,
        api_url: &str,
        api_key: &str,
        download_url: &str,
    ) -> Result<Value, RemoteError> {
        let unavailable = |reason: String| RemoteError::Unavailable { reason };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| unavailable(format!("failed to create HTTP client: {}", e)))?;

        let response = client
            .post(api_url)
            .json(&json!({
                "api_key": api_key,
                "download_url": download_url,
            }))
            .send()
            .map_err(|e| unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| unavailable(format!("failed to read response body: {}", e)))?;

        log_debug!("Remote scanner responded",
            "status" => status.as_u16(),
            "bytes" => body.len()
        );

        classify_response(status.as_u16(), body)
    }
}

/// Accept only a 2xx JSON body without an `error` key
pub fn classify_response(status: u16, body: String) -> Result<Value, RemoteError> {
    let parsed: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => return Err(RemoteError::Response { status, body }),
    };

    let reports_error = parsed
        .as_object()
        .is_some_and(|object| object.contains_key("error"));
    if !(200..300).contains(&status) || reports_error {
        return Err(RemoteError::Response { status, body });
    }

    Ok(parsed)
}

/// `invoke` through a client built with `timeout`
pub fn invoke(
    api_url: &str,
    api_key: &str,
    download_url: &str,
    timeout: Duration,
) -> Result<Value, RemoteError> {
    RemoteScannerClient::new(timeout).invoke(api_url, api_key, download_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_classify_success() {
        let value = classify_response(200, r#"{"matchedRules": ["a"]}"#.into()).unwrap();
        assert_eq!(value["matchedRules"][0], "a");
    }

    #[test]
    fn test_classify_failures_keep_raw_body() {
        assert_matches!(
            classify_response(500, r#"{"ok": true}"#.into()),
            Err(RemoteError::Response { status: 500, .. })
        );
        assert_matches!(
            classify_response(200, r#"{"error": "boom"}"#.into()),
            Err(RemoteError::Response { status: 200, body }) if body.contains("boom")
        );
        assert_matches!(
            classify_response(200, "<html>bad gateway</html>".into()),
            Err(RemoteError::Response { body, .. }) if body.starts_with("<html>")
        );
    }

    #[test]
    fn test_connection_refused_is_unavailable() {
        // a port released right after binding refuses connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let result = invoke(
            &format!("http://{}/scan", address),
            "key",
            "http://example.invalid/file",
            Duration::from_secs(2),
        );
        assert_matches!(result, Err(RemoteError::Unavailable { .. }));
    }
}
