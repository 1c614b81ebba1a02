//! # Scanner Settings
//!
//! Settings default from `XSCAN_*` environment variables and can be
//! overridden by a TOML file. Fields missing from the file keep their
//! environment-derived defaults.

use crate::archive::ArchiveLimits;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use xscan_rules::logging::{codes, Code};

/// How the active pattern rules are compiled for a submission scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationPolicy {
    /// Compile rule by rule; a rule that fails is logged and left out
    #[default]
    Isolated,
    /// Join every rule into one source; any error fails the scan
    AllOrNothing,
}

impl CompilationPolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "isolated" => Some(Self::Isolated),
            "all_or_nothing" => Some(Self::AllOrNothing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteEndpoint {
    pub api_url: String,
    pub api_key: String,
}

impl RemoteEndpoint {
    fn from_env(url_var: &str, key_var: &str) -> Self {
        Self {
            api_url: env::var(url_var).unwrap_or_default(),
            api_key: env::var(key_var).unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub customs: RemoteEndpoint,
    pub wat: RemoteEndpoint,

    /// Timeout for one remote scanner request
    pub scanner_timeout_secs: u64,

    pub archive: ArchiveLimits,
    pub compilation_policy: CompilationPolicy,

    /// Base URL used to build authenticated download URLs
    pub site_url: String,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            customs: RemoteEndpoint::from_env(env_vars::CUSTOMS_API_URL, env_vars::CUSTOMS_API_KEY),
            wat: RemoteEndpoint::from_env(env_vars::WAT_API_URL, env_vars::WAT_API_KEY),
            scanner_timeout_secs: env::var(env_vars::SCANNER_TIMEOUT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            archive: ArchiveLimits::default(),
            compilation_policy: env::var(env_vars::COMPILATION_POLICY)
                .ok()
                .and_then(|v| CompilationPolicy::parse(&v))
                .unwrap_or_default(),
            site_url: env::var(env_vars::SITE_URL)
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        }
    }
}

impl ScannerSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.scanner_timeout_secs)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.scanner_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_compilation_policy(mut self, policy: CompilationPolicy) -> Self {
        self.compilation_policy = policy;
        self
    }

    pub fn with_archive_limits(mut self, limits: ArchiveLimits) -> Self {
        self.archive = limits;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid settings: {reason}")]
    Parse { reason: String },
}

impl ConfigError {
    pub fn error_code(&self) -> Code {
        codes::system::CONFIGURATION_ERROR
    }
}

/// Environment variable names
pub mod env_vars {
    pub const CUSTOMS_API_URL: &str = "XSCAN_CUSTOMS_API_URL";
    pub const CUSTOMS_API_KEY: &str = "XSCAN_CUSTOMS_API_KEY";
    pub const WAT_API_URL: &str = "XSCAN_WAT_API_URL";
    pub const WAT_API_KEY: &str = "XSCAN_WAT_API_KEY";
    pub const SCANNER_TIMEOUT: &str = "XSCAN_SCANNER_TIMEOUT";
    pub const COMPILATION_POLICY: &str = "XSCAN_COMPILATION_POLICY";
    pub const SITE_URL: &str = "XSCAN_SITE_URL";
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ScannerSettings::from_toml_str(
            r#"
            scanner_timeout_secs = 5
            compilation_policy = "all_or_nothing"

            [customs]
            api_url = "https://customs.example/scan"
            api_key = "secret"

            [archive]
            max_entries = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.compilation_policy, CompilationPolicy::AllOrNothing);
        assert!(settings.customs.is_configured());
        assert_eq!(settings.archive.max_entries, 10);
        assert_eq!(
            settings.archive.max_entry_size,
            ArchiveLimits::default().max_entry_size
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert_matches!(
            ScannerSettings::from_toml_str("scanner_timeout_secs = \"soon\""),
            Err(ConfigError::Parse { .. })
        );
        assert_matches!(
            ScannerSettings::from_file("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        );
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            CompilationPolicy::parse("All-Or-Nothing"),
            Some(CompilationPolicy::AllOrNothing)
        );
        assert_eq!(CompilationPolicy::default(), CompilationPolicy::Isolated);
    }
}
