//! Runtime preferences read from `XSCAN_*` environment variables

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Emit JSON lines instead of the console format
    pub use_structured_logging: bool,

    /// Events below this level are dropped
    pub min_log_level: LogLevel,

    /// Log a success event with rule counts after every compilation
    pub log_compilation_summary: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| LogLevel::parse(&v))
                .unwrap_or(LogLevel::Info),
            log_compilation_summary: env::var(env_vars::LOGGING_COMPILATION_SUMMARY)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerPreferences {
    /// Reject rules whose strings are never used by the condition
    pub reject_unreferenced_strings: bool,

    /// Regex program size limit, clamped to the compile-time maximum
    pub regex_size_limit: usize,
}

impl Default for CompilerPreferences {
    fn default() -> Self {
        let max = crate::config::constants::compile_time::rules::REGEX_SIZE_LIMIT;
        Self {
            reject_unreferenced_strings: env::var(env_vars::RULES_REJECT_UNREFERENCED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            regex_size_limit: env::var(env_vars::RULES_REGEX_SIZE_LIMIT)
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|limit: usize| limit.min(max))
                .unwrap_or(max),
        }
    }
}

/// Environment variable names
pub mod env_vars {
    pub const LOGGING_USE_STRUCTURED: &str = "XSCAN_LOGGING_USE_STRUCTURED";
    pub const LOGGING_MIN_LEVEL: &str = "XSCAN_LOGGING_MIN_LEVEL";
    pub const LOGGING_COMPILATION_SUMMARY: &str = "XSCAN_LOGGING_COMPILATION_SUMMARY";
    pub const RULES_REJECT_UNREFERENCED: &str = "XSCAN_RULES_REJECT_UNREFERENCED";
    pub const RULES_REGEX_SIZE_LIMIT: &str = "XSCAN_RULES_REGEX_SIZE_LIMIT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_preferences_clamp_regex_limit() {
        let prefs = CompilerPreferences::default();
        assert!(prefs.regex_size_limit <= crate::config::constants::compile_time::rules::REGEX_SIZE_LIMIT);
    }

    #[test]
    fn test_logging_preferences_serialize_level_lowercase() {
        let prefs = LoggingPreferences {
            use_structured_logging: true,
            min_log_level: LogLevel::Debug,
            log_compilation_summary: false,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"min_log_level\":\"debug\""));
    }
}
