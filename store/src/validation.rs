//! Run validation and suite integrity checks
//!
//! `validate_run` guards `append_run`. `check_history` inspects an entire
//! suite for the invariants the chart page relies on and reports each one
//! as a named check.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::model::{Run, SuiteHistory};

/// Content hash of a stored suite file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// blake3 hash of the given bytes
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    Fingerprint(hasher.finalize().to_hex().to_string())
}

/// Check a run before it is appended
pub fn validate_run(run: &Run, config: &ValidationConfig) -> ValidationResult<()> {
    if run.benches.is_empty() {
        return Err(ValidationError::EmptyBenches);
    }

    if run.commit.id.trim().is_empty() {
        return Err(ValidationError::EmptyCommitId);
    }

    if run.date == 0 {
        return Err(ValidationError::NonPositiveDate);
    }

    if run.benches.len() > config.max_benches_per_run {
        return Err(ValidationError::TooManyBenches {
            count: run.benches.len(),
            limit: config.max_benches_per_run,
        });
    }

    let mut seen = HashSet::new();
    for (index, bench) in run.benches.iter().enumerate() {
        if bench.name.trim().is_empty() {
            return Err(ValidationError::EmptyBenchName { index });
        }

        if config.require_finite_values && !bench.value.is_finite() {
            return Err(ValidationError::NonFiniteValue { name: bench.name.clone() });
        }

        if config.require_unique_bench_names && !seen.insert(bench.name.as_str()) {
            return Err(ValidationError::DuplicateBenchName { name: bench.name.clone() });
        }
    }

    Ok(())
}

/// How much a failed check matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Individual check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check name
    pub name: String,

    /// Check result
    pub passed: bool,

    pub severity: Severity,

    /// Failure details, one entry per offending run or bench
    pub errors: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, severity: Severity, errors: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: errors.is_empty(),
            severity,
            errors,
        }
    }
}

/// Outcome of `check_history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub suite: String,
    pub runs: usize,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    /// Report for a suite whose file could not be loaded
    pub fn unreadable(suite: &str, reason: impl ToString) -> Self {
        Self {
            suite: suite.to_string(),
            runs: 0,
            checks: vec![CheckResult::new("suite_readable", Severity::Error, vec![reason.to_string()])],
        }
    }

    /// True when no error-level check failed
    pub fn passed(&self) -> bool {
        self.checks
            .iter()
            .all(|check| check.passed || check.severity == Severity::Warning)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.passed)
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }
}

/// Inspect every run of a suite
pub fn check_history(suite: &str, history: &SuiteHistory) -> IntegrityReport {
    let runs = history.runs();

    let mut last_update = Vec::new();
    if let Some(max_date) = history.max_date() {
        if history.last_update < max_date {
            last_update.push(format!(
                "lastUpdate {} is older than newest run date {}",
                history.last_update, max_date
            ));
        }
    }

    let mut ordering = Vec::new();
    for (i, pair) in runs.windows(2).enumerate() {
        if pair[1].date < pair[0].date {
            ordering.push(format!("run {} (date {}) precedes run {} (date {})", i + 1, pair[1].date, i, pair[0].date));
        }
    }

    let mut duplicates = Vec::new();
    let mut empty = Vec::new();
    let mut non_finite = Vec::new();
    let mut commit_ids = Vec::new();
    let mut timestamps = Vec::new();

    for (i, run) in runs.iter().enumerate() {
        if run.benches.is_empty() {
            empty.push(format!("run {} has no benches", i));
        }

        let mut seen = HashSet::new();
        for bench in &run.benches {
            if !seen.insert(bench.name.as_str()) {
                duplicates.push(format!("run {} repeats bench '{}'", i, bench.name));
            }
            if !bench.value.is_finite() {
                non_finite.push(format!("run {} bench '{}' is not finite", i, bench.name));
            }
        }

        if !is_commit_hash(&run.commit.id) {
            commit_ids.push(format!("run {} commit id '{}' is not a 40-character hex hash", i, run.commit.id));
        }

        if chrono::DateTime::parse_from_rfc3339(&run.commit.timestamp).is_err() {
            timestamps.push(format!("run {} commit timestamp '{}' is not RFC 3339", i, run.commit.timestamp));
        }
    }

    let checks = vec![
        CheckResult::new("last_update_covers_runs", Severity::Error, last_update),
        CheckResult::new("dates_non_decreasing", Severity::Warning, ordering),
        CheckResult::new("unique_bench_names", Severity::Error, duplicates),
        CheckResult::new("non_empty_benches", Severity::Error, empty),
        CheckResult::new("finite_values", Severity::Error, non_finite),
        CheckResult::new("commit_id_format", Severity::Warning, commit_ids),
        CheckResult::new("commit_timestamp_format", Severity::Warning, timestamps),
    ];

    IntegrityReport {
        suite: suite.to_string(),
        runs: runs.len(),
        checks,
    }
}

fn is_commit_hash(id: &str) -> bool {
    id.len() == 40 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bench, Commit, Person, Tool};

    fn run(date: u64, benches: Vec<Bench>) -> Run {
        let person = Person::new("vibhansa", "vibhansa@microsoft.com");
        Run {
            commit: Commit {
                author: person.clone(),
                committer: person,
                distinct: Some(true),
                id: "dceabf98c8b22f702a6cf9bacaf35de84bef6df4".to_string(),
                message: "Export hns env variable".to_string(),
                timestamp: "2024-06-27T23:16:58-07:00".to_string(),
                tree_id: None,
                url: None,
            },
            date,
            tool: Tool::SmallerIsBetter,
            benches,
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(b"window.BENCHMARK_DATA = {}");
        let b = fingerprint(b"window.BENCHMARK_DATA = {}");
        let c = fingerprint(b"window.BENCHMARK_DATA = { }");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_validate_run_constraints() {
        let config = ValidationConfig::default();

        assert!(validate_run(&run(1000, vec![Bench::new("seq_read", 0.1, "milliseconds")]), &config).is_ok());
        assert_eq!(validate_run(&run(1000, vec![]), &config), Err(ValidationError::EmptyBenches));
        assert_eq!(
            validate_run(&run(0, vec![Bench::new("seq_read", 0.1, "milliseconds")]), &config),
            Err(ValidationError::NonPositiveDate)
        );

        let mut blank_commit = run(1000, vec![Bench::new("seq_read", 0.1, "milliseconds")]);
        blank_commit.commit.id = "  ".to_string();
        assert_eq!(validate_run(&blank_commit, &config), Err(ValidationError::EmptyCommitId));
    }

    #[test]
    fn test_validate_run_bench_rules() {
        let config = ValidationConfig::default();

        let duplicate = run(1, vec![Bench::new("random_read", 1.0, "ms"), Bench::new("random_read", 2.0, "ms")]);
        assert_eq!(
            validate_run(&duplicate, &config),
            Err(ValidationError::DuplicateBenchName { name: "random_read".to_string() })
        );

        let nan = run(1, vec![Bench::new("random_read", f64::NAN, "ms")]);
        assert!(matches!(validate_run(&nan, &config), Err(ValidationError::NonFiniteValue { .. })));

        let unnamed = run(1, vec![Bench::new("a", 1.0, "ms"), Bench::new("", 1.0, "ms")]);
        assert_eq!(validate_run(&unnamed, &config), Err(ValidationError::EmptyBenchName { index: 1 }));

        let relaxed = ValidationConfig {
            require_unique_bench_names: false,
            ..ValidationConfig::default()
        };
        assert!(validate_run(&duplicate, &relaxed).is_ok());

        let tight = ValidationConfig {
            max_benches_per_run: 1,
            ..ValidationConfig::default()
        };
        assert!(matches!(
            validate_run(&duplicate, &tight),
            Err(ValidationError::TooManyBenches { count: 2, limit: 1 })
        ));
    }

    #[test]
    fn test_check_history_clean_suite() {
        let mut history = SuiteHistory::new("https://github.com/Azure/azure-storage-fuse");
        history.push_run(run(1000, vec![Bench::new("sequential_write", 0.13, "milliseconds")]));
        history.push_run(run(2000, vec![Bench::new("sequential_write", 0.12, "milliseconds")]));

        let report = check_history("standard_hns/latency/write", &history);
        assert!(report.passed());
        assert_eq!(report.runs, 2);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_check_history_reports_violations() {
        let mut history = SuiteHistory::new("");
        history.push_run(run(2000, vec![Bench::new("a", 1.0, "ms"), Bench::new("a", 2.0, "ms")]));
        history.push_run(run(1000, vec![Bench::new("b", 1.0, "ms")]));
        history.last_update = 1500;
        history.entries.benchmark[1].commit.id = "rerun".to_string();

        let report = check_history("premium/latency/read", &history);
        assert!(!report.passed());
        assert!(!report.check("last_update_covers_runs").unwrap().passed);
        assert!(!report.check("unique_bench_names").unwrap().passed);
        assert!(!report.check("dates_non_decreasing").unwrap().passed);
        assert!(!report.check("commit_id_format").unwrap().passed);
        assert!(report.check("commit_timestamp_format").unwrap().passed);
    }

    #[test]
    fn test_warnings_do_not_fail_report() {
        let mut history = SuiteHistory::new("");
        let mut odd = run(1000, vec![Bench::new("a", 1.0, "ms")]);
        odd.commit.timestamp = "yesterday".to_string();
        history.push_run(odd);

        let report = check_history("suite", &history);
        assert!(report.passed());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_unreadable_report_fails() {
        let report = IntegrityReport::unreadable("X86/standard/time/list", "Invalid suite file format");
        assert!(!report.passed());
        assert_eq!(report.runs, 0);
        let check = report.check("suite_readable").unwrap();
        assert_eq!(check.severity, Severity::Error);
        assert_eq!(check.errors, vec!["Invalid suite file format".to_string()]);
    }
}
