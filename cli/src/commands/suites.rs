use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::BenchmarkHistoryStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct SuitesArgs {
    /// Only list suites under this prefix (e.g. "X86/premium")
    #[arg(long)]
    pub prefix: Option<String>,
}

pub async fn run(args: SuitesArgs, store: &BenchmarkHistoryStore, output: &OutputManager) -> Result<()> {
    let mut suites = store.list_suites().await?;

    if let Some(prefix) = args.prefix.as_deref() {
        let prefix = prefix.trim_end_matches('/');
        suites.retain(|suite| {
            let id = suite.as_str();
            id == prefix || id.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
        });
    }

    output.print_suites(&suites)
}
