//! Per-entry matching of an archive against a compiled rule set

use crate::archive::{decode_content, ArchiveError, ArchiveLimits, ArchiveReader};
use crate::types::MatchRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use xscan_rules::logging::codes;
use xscan_rules::{log_error, log_success, log_warning, CompiledRuleSet};

/// Counters for one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub decode_replacements: usize,
    pub matches: usize,
}

/// Accumulates match records for one archive
///
/// Entries that cannot be read are logged and counted, and the remaining
/// entries are still scanned.
pub struct ScanResultAggregator<'r> {
    rules: &'r CompiledRuleSet,
    matches: Vec<MatchRecord>,
    summary: AggregationSummary,
}

impl<'r> ScanResultAggregator<'r> {
    pub fn new(rules: &'r CompiledRuleSet) -> Self {
        Self {
            rules,
            matches: Vec::new(),
            summary: AggregationSummary::default(),
        }
    }

    /// Scan every non-directory entry of an open archive
    ///
    /// Entry errors are skipped; an archive-level error aborts the scan.
    pub fn scan_archive(&mut self, reader: &mut ArchiveReader) -> Result<(), ArchiveError> {
        for file in reader.files() {
            match file {
                Ok(file) => self.add_file(&file.entry.name, &file.content),
                Err(error) if error.is_entry_error() => {
                    log_error!(error.error_code(), "Skipping unreadable archive entry",
                        "error" => error
                    );
                    self.summary.files_skipped += 1;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Match one entry's raw bytes and record every match under its name
    ///
    /// Content that is not valid UTF-8 is still matched byte for byte; the
    /// replacement count only feeds the decode warning.
    pub fn add_file(&mut self, name: &str, content: &[u8]) {
        let (_, replaced) = decode_content(content);
        if replaced {
            log_warning!(code: codes::archive::DECODE_REPLACEMENT,
                "Entry is not valid UTF-8; matched as raw bytes",
                "entry" => name
            );
            self.summary.decode_replacements += 1;
        }

        let found = self.rules.scan(content);
        self.summary.files_scanned += 1;
        self.summary.matches += found.len();
        self.matches.extend(
            found
                .into_iter()
                .map(|rule_match| MatchRecord::from_rule_match(rule_match, name)),
        );
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn summary(&self) -> &AggregationSummary {
        &self.summary
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn matched_rule_names(&self) -> BTreeSet<String> {
        self.matches.iter().map(|m| m.rule.clone()).collect()
    }

    pub fn into_matches(self) -> Vec<MatchRecord> {
        self.matches
    }
}

/// Open `path`, match every entry and close the archive
pub fn scan_archive_path(
    rules: &CompiledRuleSet,
    path: &Path,
    limits: ArchiveLimits,
) -> Result<(Vec<MatchRecord>, AggregationSummary), ArchiveError> {
    let mut reader = ArchiveReader::open(path, limits)?;
    let mut aggregator = ScanResultAggregator::new(rules);
    let scanned = aggregator.scan_archive(&mut reader);
    reader.close();
    scanned?;

    let summary = aggregator.summary().clone();
    log_success!(codes::success::ARCHIVE_SCANNED, "Archive scanned",
        "archive" => path.display(),
        "files" => summary.files_scanned,
        "skipped" => summary.files_skipped,
        "matches" => summary.matches
    );
    Ok((aggregator.into_matches(), summary))
}
