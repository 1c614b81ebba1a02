//! # Public API
//!
//! Settings, the boundary error type and the scheduler-facing task entry points.

pub mod config;
pub mod errors;
pub mod tasks;

pub use config::{CompilationPolicy, ConfigError, RemoteEndpoint, ScannerSettings};
pub use errors::ScanError;
pub use tasks::ScanTasks;
