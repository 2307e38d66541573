use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, SuiteId};
use clap::Args;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Suite name (e.g. "X86/premium/latency/read")
    pub suite: SuiteId,

    /// Only show the newest N runs (table and csv output)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

pub async fn run(args: ShowArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let history = store.get_history(&args.suite).await?;
    output.print_history(&args.suite, &history, args.limit)
}
