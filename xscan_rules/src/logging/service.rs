//! Logging service and logger backends

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Destination for log events
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Level filter in front of a single logger backend
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    /// Service built from the runtime logging preferences
    pub fn with_config() -> Self {
        let min_level = config::get_min_log_level();
        let logger: Arc<dyn Logger> = if config::use_structured_logging() {
            Arc::new(StructuredLogger)
        } else {
            Arc::new(ConsoleLogger)
        };

        Self::new(logger, min_level)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }

    pub fn log_error_with_context(&self, code: Code, message: &str, context: Vec<(&str, &str)>) {
        let mut event = LogEvent::error(code, message);
        for (key, value) in context {
            event = event.with_context(key, value);
        }
        self.log_event(event);
    }
}

/// Human-readable lines; errors go to stderr
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        match event.level {
            LogLevel::Error => eprintln!("{}", event.format()),
            _ => println!("{}", event.format()),
        }
    }
}

/// One JSON object per line
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        let line = event.format_json().unwrap_or_else(|_| event.format());
        match event.level {
            LogLevel::Error => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

/// Forwards events to the `log` facade so host applications pick their backend
pub struct FacadeLogger;

impl FacadeLogger {
    fn facade_level(level: LogLevel) -> log::Level {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

impl Logger for FacadeLogger {
    fn log(&self, event: &LogEvent) {
        log::log!(
            target: "xscan",
            Self::facade_level(event.level),
            "{}",
            event.format()
        );
    }
}

/// Buffers events for inspection in tests
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    pub fn get_events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }

    /// Events whose context carries `key == value`
    pub fn get_events_with_context(&self, key: &str, value: &str) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.context.get(key).map(String::as_str) == Some(value))
            .cloned()
            .collect()
    }

    pub fn has_error_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_error() && e.code == code)
    }

    pub fn get_summary(&self) -> EventSummary {
        let events = self.lock();
        EventSummary {
            total_count: events.len(),
            error_count: events.iter().filter(|e| e.is_error()).count(),
            warning_count: events.iter().filter(|e| e.is_warning()).count(),
            info_count: events.iter().filter(|e| e.is_info()).count(),
        }
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();

        let max_events = config::get_error_buffer_size();
        if events.len() >= max_events {
            let remove_count = events.len() - max_events + 1;
            events.drain(0..remove_count);
        }

        events.push(event.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub total_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl EventSummary {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

/// Service backed by a fresh memory logger, plus a handle to inspect it
pub fn create_test_service(min_level: LogLevel) -> (LoggingService, Arc<MemoryLogger>) {
    let memory = Arc::new(MemoryLogger::new());
    let service = LoggingService::new(memory.clone(), min_level);
    (service, memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_memory_logger() {
        let logger = MemoryLogger::new();
        logger.log(&LogEvent::error(codes::archive::ENTRY_TOO_LARGE, "too big"));
        logger.log(&LogEvent::success(codes::success::ARCHIVE_SCANNED, "done"));

        assert_eq!(logger.event_count(), 2);
        assert!(logger.has_error_with_code(codes::archive::ENTRY_TOO_LARGE));
        assert!(!logger.has_error_with_code(codes::success::ARCHIVE_SCANNED));

        let summary = logger.get_summary();
        assert!(summary.has_errors());
        assert_eq!(summary.info_count, 1);

        logger.clear();
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_log_level_filtering() {
        let (service, memory) = create_test_service(LogLevel::Warning);

        service.log_event(LogEvent::debug("noise"));
        service.log_event(LogEvent::info("noise"));
        service.log_event(LogEvent::warning("kept"));
        service.log_error_with_context(
            codes::scanner::STORE_FAILURE,
            "kept",
            vec![("scanner", "yara")],
        );

        assert_eq!(memory.event_count(), 2);
        assert_eq!(memory.get_events_with_context("scanner", "yara").len(), 1);
    }

    #[test]
    fn test_facade_level_mapping() {
        assert_eq!(FacadeLogger::facade_level(LogLevel::Warning), log::Level::Warn);
        assert_eq!(FacadeLogger::facade_level(LogLevel::Error), log::Level::Error);
    }
}
