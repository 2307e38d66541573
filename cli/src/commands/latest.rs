use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, SuiteId};
use clap::Args;

#[derive(Args, Debug)]
pub struct LatestArgs {
    /// Suite name
    pub suite: SuiteId,
}

pub async fn run(args: LatestArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let run = store.get_latest(&args.suite).await?;
    output.print_run(&args.suite, &run)
}
