use super::Scanner;
use crate::api::config::CompilationPolicy;
use crate::api::errors::ScanError;
use crate::archive::ArchiveLimits;
use crate::results::scan_archive_path;
use crate::types::{ResultPayload, RuleSnapshot, ScanTarget, ScannerKind};
use xscan_rules::config::CompilerPreferences;
use xscan_rules::logging::codes;
use xscan_rules::{compile, log_warning, CompiledRuleSet, Compiler};

/// Local rule engine over the package's zip entries
#[derive(Debug, Clone, Default)]
pub struct PatternScanner {
    policy: CompilationPolicy,
    limits: ArchiveLimits,
    preferences: CompilerPreferences,
}

impl PatternScanner {
    pub fn new(policy: CompilationPolicy, limits: ArchiveLimits) -> Self {
        Self {
            policy,
            limits,
            preferences: CompilerPreferences::default(),
        }
    }

    pub fn policy(&self) -> CompilationPolicy {
        self.policy
    }

    /// Compile the snapshot's active rules according to the policy
    pub fn compile_snapshot(&self, rules: &RuleSnapshot) -> Result<CompiledRuleSet, ScanError> {
        match self.policy {
            CompilationPolicy::AllOrNothing => Ok(compile(&rules.joined_source())?),
            CompilationPolicy::Isolated => {
                let mut compiler = Compiler::with_preferences(self.preferences.clone());
                for (rule, source) in rules.compilable() {
                    if let Err(error) = compiler.add_source(source) {
                        log_warning!(code: codes::scanner::RULE_SKIPPED,
                            "Rule left out of the scan after failing to compile",
                            "rule_id" => rule.id,
                            "rule" => rule.name,
                            "error" => error
                        );
                    }
                }
                Ok(compiler.build())
            }
        }
    }
}

impl Scanner for PatternScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Yara
    }

    fn run(&self, target: &ScanTarget, rules: &RuleSnapshot) -> Result<ResultPayload, ScanError> {
        let compiled = self.compile_snapshot(rules)?;
        let (matches, _summary) = scan_archive_path(&compiled, &target.path, self.limits)?;
        Ok(ResultPayload::Matches(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleDefinition;
    use assert_matches::assert_matches;

    fn snapshot(sources: &[&str]) -> RuleSnapshot {
        RuleSnapshot::new(
            ScannerKind::Yara,
            sources
                .iter()
                .enumerate()
                .map(|(index, source)| RuleDefinition {
                    id: index as u64 + 1,
                    name: format!("rule_{}", index),
                    scanner: ScannerKind::Yara,
                    definition: Some(source.to_string()),
                    is_active: true,
                })
                .collect(),
        )
    }

    #[test]
    fn test_isolated_policy_skips_broken_rule() {
        let rules = snapshot(&[
            "rule ok { condition: true }",
            "rule broken { condition: $missing }",
            "rule also_ok { condition: ok }",
        ]);
        let scanner = PatternScanner::new(CompilationPolicy::Isolated, ArchiveLimits::default());
        let compiled = scanner.compile_snapshot(&rules).unwrap();
        assert_eq!(compiled.rule_names().collect::<Vec<_>>(), vec!["ok", "also_ok"]);
    }

    #[test]
    fn test_all_or_nothing_policy_fails_whole_set() {
        let rules = snapshot(&["rule ok { condition: true }", "rule broken { condition: $missing }"]);
        let scanner = PatternScanner::new(CompilationPolicy::AllOrNothing, ArchiveLimits::default());
        assert_matches!(
            scanner.compile_snapshot(&rules),
            Err(ScanError::RuleCompilation(error)) if error.line == 2
        );
    }
}
