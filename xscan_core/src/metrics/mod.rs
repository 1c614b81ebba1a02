//! Counter and timing seam
//!
//! Emission backends live outside the crate. [`MemoryMetrics`] records
//! everything for tests and [`LoggingMetrics`] forwards to the debug log.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use xscan_rules::log_debug;

pub trait MetricsSink: Send + Sync {
    fn incr(&self, name: &str);
    fn timing(&self, name: &str, duration: Duration);
}

/// Run `f` and report its wall time under `name`, whatever it returns
pub fn timed<T>(sink: &dyn MetricsSink, name: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    sink.timing(name, start.elapsed());
    result
}

// === metric names ===

pub fn scanner_timer(kind: impl std::fmt::Display) -> String {
    format!("devhub.{}", kind)
}

pub fn scanner_counter(kind: impl std::fmt::Display, event: &str) -> String {
    format!("devhub.{}.{}", kind, event)
}

pub fn rule_match_counter(kind: impl std::fmt::Display, rule_id: u64) -> String {
    format!("devhub.{}.rule.{}.match", kind, rule_id)
}

pub const QUERY_SUCCESS: &str = "scanners.run_yara_query_rule_on_version.success";
pub const QUERY_FAILURE: &str = "scanners.run_yara_query_rule_on_version.failure";

#[derive(Debug, Default)]
struct Recorded {
    counters: BTreeMap<String, u64>,
    timings: BTreeMap<String, Vec<Duration>>,
}

#[derive(Debug, Default)]
pub struct MemoryMetrics {
    recorded: Mutex<Recorded>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn count(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    pub fn timing_count(&self, name: &str) -> usize {
        self.lock().timings.get(name).map_or(0, Vec::len)
    }

    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.lock().counters.clone()
    }

    /// Nothing recorded at all
    pub fn is_empty(&self) -> bool {
        let recorded = self.lock();
        recorded.counters.is_empty() && recorded.timings.is_empty()
    }
}

impl MetricsSink for MemoryMetrics {
    fn incr(&self, name: &str) {
        *self.lock().counters.entry(name.to_string()).or_insert(0) += 1;
    }

    fn timing(&self, name: &str, duration: Duration) {
        self.lock()
            .timings
            .entry(name.to_string())
            .or_default()
            .push(duration);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMetrics;

impl MetricsSink for LoggingMetrics {
    fn incr(&self, name: &str) {
        log_debug!("metric incremented", "metric" => name);
    }

    fn timing(&self, name: &str, duration: Duration) {
        log_debug!("metric timing", "metric" => name, "ms" => duration.as_millis());
    }
}
