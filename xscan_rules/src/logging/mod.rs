//! Process-wide coded logging
//!
//! Every layer of the scanner logs through the macros exported here. When no
//! service has been installed the macros are no-ops, so library code never
//! depends on initialisation order.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::fmt::Display;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{
    ConsoleLogger, FacadeLogger, Logger, LoggingService, MemoryLogger, StructuredLogger,
};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

thread_local! {
    static SCAN_CONTEXT: RefCell<Option<ScanContext>> = const { RefCell::new(None) };
}

/// Scanner and target attached to every event logged on this thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub scanner: String,
    pub target: String,
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Install the service described by the runtime logging preferences
pub fn init_global_logging() -> Result<(), String> {
    let service = Arc::new(LoggingService::with_config());
    init_global_logging_with_service(service.clone())?;

    service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));
    Ok(())
}

/// Install a caller-built service (facade forwarding, memory capture in tests)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

// ============================================================================
// SCAN CONTEXT
// ============================================================================

/// Run `f` with a scan context installed, restoring the previous one after
pub fn with_scan_context<F, R>(scanner: &str, target: impl Display, f: F) -> R
where
    F: FnOnce() -> R,
{
    let context = ScanContext {
        scanner: scanner.to_string(),
        target: target.to_string(),
    };
    let previous = SCAN_CONTEXT.with(|ctx| ctx.borrow_mut().replace(context));
    let result = f();
    SCAN_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
    result
}

pub fn get_current_scan_context() -> Option<ScanContext> {
    SCAN_CONTEXT.with(|ctx| ctx.borrow().clone())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn emit(mut event: LogEvent, context: Vec<(&str, &str)>) {
    let Some(logger) = try_get_global_logger() else {
        return;
    };
    if !logger.should_log(event.level) {
        return;
    }

    event.message = config::clamp_message(&event.message).to_string();
    if let Some(scan) = get_current_scan_context() {
        event = event
            .with_context("scanner", &scan.scanner)
            .with_context("target", &scan.target);
    }
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    logger.log_event(event);
}

/// Used by `log_error!`
pub fn log_error_with_context(
    code: Code,
    message: &str,
    span: Option<crate::utils::Span>,
    context: Vec<(&str, &str)>,
) {
    let mut event = LogEvent::error(code, message);
    if let Some(s) = span {
        event = event.with_span(s);
    }
    emit(event, context);
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::success(code, message), context);
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::info(message), context);
}

/// Used by `log_warning!`
pub fn log_warning_with_context(code: Option<Code>, message: &str, context: Vec<(&str, &str)>) {
    let event = match code {
        Some(code) => LogEvent::warning_with_code(code, message),
        None => LogEvent::warning(message),
    };
    emit(event, context);
}

/// Used by `log_debug!`
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    emit(LogEvent::debug(message), context);
}

/// Error logging that falls back to stderr when no service is installed
pub fn safe_log_error(code: Code, message: &str) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(LogEvent::error(code, message));
    } else {
        eprintln!("[ERROR] FALLBACK: [{}] {}", code.as_str(), message);
    }
}
