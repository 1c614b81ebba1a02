use std::time::Duration;

/// Counters accumulated by a [`Compiler`](super::Compiler)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilationStats {
    pub sources_accepted: usize,
    pub sources_rejected: usize,
    pub rules_compiled: usize,
    pub strings_compiled: usize,
    pub bytes_processed: usize,
    pub total_time: Duration,
}

impl CompilationStats {
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.sources_accepted + self.sources_rejected;
        if total == 0 {
            0.0
        } else {
            self.sources_accepted as f64 / total as f64
        }
    }

    /// Source bytes compiled per second
    pub fn throughput(&self) -> f64 {
        if self.total_time.as_secs_f64() > 0.0 {
            self.bytes_processed as f64 / self.total_time.as_secs_f64()
        } else {
            0.0
        }
    }
}
