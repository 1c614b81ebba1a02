//! Aggregation of per-entry rule matches into match records

pub mod aggregator;

pub use aggregator::{scan_archive_path, AggregationSummary, ScanResultAggregator};
