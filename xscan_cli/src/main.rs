//! # xscan
//!
//! Command-line front end: check rule files, scan extension packages with
//! the local pattern engine, and run a one-off query rescan.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;
use xscan_core::prelude::*;
use xscan_core::results::scan_archive_path;
use xscan_rules::config::LoggingPreferences;
use xscan_rules::logging::{self, codes, LogLevel, LoggingService};
use xscan_rules::{log_error, log_info, log_success, log_warning, CompiledRuleSet, Compiler};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "xscan", version, about = "Extension package scanner")]
struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LoggingArgs {
    /// How log events are written
    #[arg(long, value_enum, default_value_t = LogFormat::Console, global = true)]
    log_format: LogFormat,

    /// error, warning, info or debug
    #[arg(long, default_value = "warning", global = true)]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Console,
    Json,
    /// Forward to the `log` facade through env_logger
    Facade,
}

#[derive(Subcommand)]
enum Command {
    /// Compile rule files and report diagnostics
    Check {
        #[arg(required = true)]
        rules: Vec<PathBuf>,
    },

    /// Scan one archive, or every .zip/.xpi under a directory
    Scan {
        #[arg(long = "rules", required = true)]
        rules: Vec<PathBuf>,

        /// Archive file or directory
        target: PathBuf,

        /// Write JSON results here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Re-run a single query rule against a published archive
    Query {
        #[arg(long)]
        rule: PathBuf,

        /// no_action, flag_for_human_review, delay_auto_approval or
        /// delay_auto_approval_indefinitely
        #[arg(long, default_value = "no_action")]
        action: String,

        archive: PathBuf,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    let outcome = match cli.command {
        Command::Check { rules } => check_rules(&rules),
        Command::Scan {
            rules,
            target,
            output,
        } => scan(&rules, &target, output.as_deref()),
        Command::Query {
            rule,
            action,
            archive,
            output,
        } => query(&rule, &action, &archive, output.as_deref()),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log_error!(codes::system::CONFIGURATION_ERROR, "Command failed", "error" => e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(args: &LoggingArgs) -> CliResult<()> {
    let level = LogLevel::parse(&args.log_level)
        .ok_or_else(|| format!("unknown log level '{}'", args.log_level))?;
    logging::config::init_runtime_preferences(LoggingPreferences {
        use_structured_logging: matches!(args.log_format, LogFormat::Json),
        min_log_level: level,
        ..LoggingPreferences::default()
    })?;

    let logger: Arc<dyn logging::Logger> = match args.log_format {
        LogFormat::Console => Arc::new(logging::ConsoleLogger),
        LogFormat::Json => Arc::new(logging::StructuredLogger),
        LogFormat::Facade => {
            env_logger::Builder::new()
                .filter_level(facade_filter(level))
                .parse_default_env()
                .try_init()?;
            Arc::new(logging::FacadeLogger)
        }
    };

    logging::init_global_logging_with_service(Arc::new(LoggingService::new(logger, level)))?;
    Ok(())
}

fn facade_filter(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Error => log::LevelFilter::Error,
        LogLevel::Warning => log::LevelFilter::Warn,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Debug => log::LevelFilter::Debug,
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Compile every file; rejected files are reported and left out
fn compile_rule_files(paths: &[PathBuf]) -> CliResult<(CompiledRuleSet, usize)> {
    let mut compiler = Compiler::new();
    let mut rejected = 0;

    for path in paths {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        if let Err(e) = compiler.add_source(&source) {
            rejected += 1;
            eprintln!(
                "{}: {} error [{}] {}",
                path.display(),
                e.stage,
                e.error_code().as_str(),
                e
            );
            eprintln!("{}", e.diagnostic(&source));
        }
    }

    let stats = compiler.stats().clone();
    log_info!("Rule files compiled",
        "accepted" => stats.sources_accepted,
        "rejected" => stats.sources_rejected,
        "rules" => stats.rules_compiled
    );
    Ok((compiler.build(), rejected))
}

fn check_rules(paths: &[PathBuf]) -> CliResult<bool> {
    let start = Instant::now();
    let (rules, rejected) = compile_rule_files(paths)?;

    println!("Files: {}", paths.len());
    println!("Rejected: {}", rejected);
    println!("Rules: {}", rules.rule_count());
    println!("Duration: {:.2}s", start.elapsed().as_secs_f64());
    Ok(rejected == 0)
}

// ============================================================================
// SCAN
// ============================================================================

#[derive(Serialize)]
struct ArchiveReport {
    path: PathBuf,
    matches: Vec<MatchRecord>,
    summary: Option<AggregationSummary>,
    error: Option<String>,
}

fn scan(rule_paths: &[PathBuf], target: &Path, output: Option<&Path>) -> CliResult<bool> {
    let start = Instant::now();
    let (rules, rejected) = compile_rule_files(rule_paths)?;
    if rules.is_empty() {
        log_warning!("No rules compiled, every archive will scan clean");
    }

    let archives = if target.is_dir() {
        discover_archives(target)
    } else {
        vec![target.to_path_buf()]
    };
    log_info!("Discovered archives", "count" => archives.len(), "target" => target.display());

    let limits = ScannerSettings::default().archive;
    let mut failed = 0;
    let reports: Vec<ArchiveReport> = archives
        .into_iter()
        .map(|path| match scan_archive_path(&rules, &path, limits) {
            Ok((matches, summary)) => ArchiveReport {
                path,
                matches,
                summary: Some(summary),
                error: None,
            },
            Err(e) => {
                failed += 1;
                log_error!(e.error_code(), "Archive scan failed",
                    "path" => path.display(),
                    "error" => e
                );
                ArchiveReport {
                    path,
                    matches: Vec::new(),
                    summary: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    let matched = reports.iter().filter(|r| !r.matches.is_empty()).count();
    write_json(&reports, output)?;

    log_success!(codes::success::ARCHIVE_SCANNED, "Scan completed",
        "archives" => reports.len(),
        "with_matches" => matched,
        "failed" => failed,
        "duration_ms" => start.elapsed().as_millis()
    );
    Ok(failed == 0 && rejected == 0)
}

fn discover_archives(dir: &Path) -> Vec<PathBuf> {
    let mut archives: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log_warning!("Skipping unreadable directory entry", "error" => e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip") || ext.eq_ignore_ascii_case("xpi"))
        })
        .collect();
    archives.sort();
    archives
}

// ============================================================================
// QUERY
// ============================================================================

#[derive(Serialize)]
struct QueryReport {
    result: Option<QueryResult>,
    dispatched: Vec<RuleAction>,
    error: Option<String>,
}

fn query(rule_path: &Path, action: &str, archive: &Path, output: Option<&Path>) -> CliResult<bool> {
    let action = RuleAction::parse(action).ok_or_else(|| format!("unknown action '{}'", action))?;
    let definition = std::fs::read_to_string(rule_path)
        .map_err(|e| format!("cannot read {}: {}", rule_path.display(), e))?;

    let store = Arc::new(MemoryStore::new());
    store.add_query_rule(QueryRule {
        rule: RuleDefinition {
            id: 1,
            name: rule_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            scanner: ScannerKind::Yara,
            definition: Some(definition),
            is_active: true,
        },
        action,
    });
    store.add_version(PublishedVersion {
        id: 1,
        addon_id: 1,
        file_path: archive.to_path_buf(),
    });

    let dispatcher = Arc::new(RecordingDispatcher::new());
    let rescanner = QueryRescanner::new(
        store,
        Arc::new(LoggingMetrics),
        dispatcher.clone(),
        ScannerSettings::default().archive,
    );

    let outcome = rescanner.run_with_outcome(1, 1);
    let report = QueryReport {
        result: outcome.result().cloned(),
        dispatched: dispatcher
            .dispatched()
            .into_iter()
            .map(|(action, _)| action)
            .collect(),
        error: outcome.error().map(ToString::to_string),
    };
    write_json(&report, output)?;
    Ok(report.error.is_none())
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("[OK] Results saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
