use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, SuiteId};
use clap::Args;

#[derive(Args, Debug)]
pub struct BenchesArgs {
    /// Suite name
    pub suite: SuiteId,
}

pub async fn run(args: BenchesArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let names = store.bench_names(&args.suite).await?;
    output.print_bench_names(&args.suite, &names)
}
