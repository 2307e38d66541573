use crate::error::{CliError, Result};
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, Run, SuiteId};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Suite name; created on first append
    pub suite: SuiteId,

    /// File holding one run as JSON ("-" reads stdin)
    #[arg(long, default_value = "-")]
    pub run: PathBuf,
}

pub async fn run(args: AppendArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let content = read_input(&args.run).await?;
    if content.trim().is_empty() {
        return Err(CliError::InvalidInput("no run JSON given".to_string()));
    }

    let run: Run = serde_json::from_str(&content)?;
    let date = run.date;
    let benches = run.benches.len();

    store.append_run(&args.suite, run).await?;
    store.flush().await?;

    output.print_success(&format!(
        "Appended run dated {} with {} bench(es) to {}",
        date, benches, args.suite
    ))
}

async fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        tokio::io::stdin().read_to_string(&mut content).await?;
        Ok(content)
    } else {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
