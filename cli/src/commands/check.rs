use crate::error::{CliError, Result};
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, HistoryError, IntegrityReport, SuiteId};
use clap::Args;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Suite to check
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub suite: Option<SuiteId>,

    /// Check every suite under the root
    #[arg(long)]
    pub all: bool,
}

pub async fn run(args: CheckArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let suites = match args.suite {
        Some(suite) => vec![suite],
        None => store.list_suites().await?,
    };

    let mut reports = Vec::with_capacity(suites.len());
    for suite in &suites {
        let report = match store.check_suite(suite).await {
            Ok(report) => report,
            // An unreadable file fails its own report; the remaining suites are still checked
            Err(e @ (HistoryError::Storage(_) | HistoryError::Serialization(_) | HistoryError::Io(_))) => {
                tracing::warn!("Suite {} could not be loaded: {}", suite, e);
                IntegrityReport::unreadable(suite.as_str(), &e)
            }
            Err(e) => return Err(e.into()),
        };
        reports.push(report);
    }

    output.print_reports(&reports)?;

    let failed = reports.iter().filter(|report| !report.passed()).count();
    if failed > 0 {
        return Err(CliError::CheckFailed {
            failed,
            checked: reports.len(),
        });
    }

    output.print_success(&format!("{} suite(s) passed integrity checks", reports.len()))
}
