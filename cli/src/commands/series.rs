use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::{BenchmarkHistoryStore, SuiteId};
use clap::Args;

#[derive(Args, Debug)]
pub struct SeriesArgs {
    /// Suite name
    pub suite: SuiteId,

    /// Bench name (e.g. "random_read")
    pub bench: String,
}

pub async fn run(args: SeriesArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let series = store.get_series(&args.suite, &args.bench).await?;
    tracing::debug!("Series {} / {} has {} samples", args.suite, args.bench, series.len());
    output.print_series(&series)
}
