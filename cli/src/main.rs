use benchhist_store::error::ConfigError;
use benchhist_store::{BenchmarkHistoryStore, StoreConfig};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::*;
use error::{CliError, Result};
use output::{OutputFormat, OutputManager};

#[derive(Parser)]
#[command(name = "benchhist")]
#[command(about = "benchhist - Query and append continuous-benchmark history stored in data.js files")]
#[command(version)]
#[command(long_about = "
benchhist reads and appends the per-suite data.js files that continuous-benchmark
dashboards are built from. Each suite lives in <root>/<suite>/data.js.

Examples:
  benchhist --root dev/bench suites                              # List suites
  benchhist --root dev/bench latest X86/premium/latency/read     # Newest run
  benchhist --root dev/bench series premium/latency/read random_read --format csv
  benchhist --root dev/bench append premium/latency/read --run run.json
  benchhist --root dev/bench check --all                         # Integrity report
")]
struct Cli {
    /// Directory holding the suite tree (overrides the config file)
    #[arg(long, global = true, env = "BENCHHIST_ROOT")]
    root: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormatArg,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file path
    #[arg(long, global = true, env = "BENCHHIST_CONFIG")]
    config: Option<PathBuf>,

    /// Print store metrics to stderr when the command finishes
    #[arg(long, global = true, value_enum)]
    metrics: Option<MetricsFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormatArg {
    Table,
    Json,
    Csv,
    Yaml,
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MetricsFormatArg {
    Prometheus,
    Json,
}

impl MetricsFormatArg {
    fn as_str(self) -> &'static str {
        match self {
            MetricsFormatArg::Prometheus => "prometheus",
            MetricsFormatArg::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the suites under the root
    Suites(SuitesArgs),

    /// Show the run history of a suite
    Show(ShowArgs),

    /// Show the newest run of a suite
    Latest(LatestArgs),

    /// Print the (date, value) series of one bench
    Series(SeriesArgs),

    /// List the bench names recorded in a suite
    Benches(BenchesArgs),

    /// Append one run (JSON) to a suite
    Append(AppendArgs),

    /// Check suites for broken invariants
    Check(CheckArgs),

    /// Manage benchhist configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle completion generation
    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return;
    }

    let config_path = cli.config.clone().or_else(|| StoreConfig::default_config_path().ok());
    let config = load_config(&cli, config_path.as_deref());

    // Initialize logging
    let default_level = config.as_ref().map(|c| c.logging.level.clone()).unwrap_or_else(|_| "warn".to_string());
    let json_logs = cli.json_logs || matches!(&config, Ok(c) if c.logging.format == "json");
    init_logging(&cli, &default_level, json_logs);

    let result = match config {
        Ok(config) => run_command(cli, config, config_path).await,
        Err(e) => Err(e),
    };

    // Run the command
    if let Err(e) = result {
        let error_msg = error::format_error(&e);
        eprintln!("{}", error_msg);
        process::exit(e.exit_code());
    }
}

async fn run_command(cli: Cli, mut config: StoreConfig, config_path: Option<PathBuf>) -> Result<()> {
    if let Some(root) = &cli.root {
        config.storage.root_path = root.clone();
    }

    // Create output manager
    let colored = !cli.no_color && !cli.quiet && console::Term::stdout().features().colors_supported();
    let output = OutputManager::new(OutputFormat::from(cli.format), colored).with_quiet(cli.quiet);

    if let Commands::Config(args) = cli.command {
        let path = config_path.ok_or_else(|| ConfigError::ValidationFailed {
            reason: "Unable to determine config file path; pass --config".to_string(),
        })?;
        return commands::config::run(args, &config, &path, &output).await;
    }

    info!("Opening suites under {}", config.storage.root_path.display());
    let store = BenchmarkHistoryStore::open(&config)?;
    let metrics_format = cli.metrics;

    // Route to appropriate command
    let result = match cli.command {
        Commands::Suites(args) => commands::suites::run(args, &store, &output).await,
        Commands::Show(args) => commands::show::run(args, &store, &output).await,
        Commands::Latest(args) => commands::latest::run(args, &store, &output).await,
        Commands::Series(args) => commands::series::run(args, &store, &output).await,
        Commands::Benches(args) => commands::benches::run(args, &store, &output).await,
        Commands::Append(args) => commands::append::run(args, &store, &output).await,
        Commands::Check(args) => commands::check::run(args, &store, &output).await,
        Commands::Config(_) | Commands::Completions { .. } => {
            unreachable!("handled before the store is opened")
        }
    };

    if let Some(format) = metrics_format {
        print_metrics(&store, format, &output)?;
    }

    store.close().await?;
    result
}

fn print_metrics(store: &BenchmarkHistoryStore, format: MetricsFormatArg, output: &OutputManager) -> Result<()> {
    if !store.metrics().is_enabled() {
        return output.print_warning("Metrics are disabled in the configuration ([metrics] enabled = false)");
    }

    eprintln!("{}", store.metrics().export(format.as_str())?.trim_end());
    Ok(())
}

fn load_config(cli: &Cli, config_path: Option<&std::path::Path>) -> Result<StoreConfig> {
    // An explicitly named file must exist; the default location is optional
    if let Some(path) = &cli.config {
        if !path.exists() && !matches!(cli.command, Commands::Config(ConfigArgs { action: ConfigAction::Init { .. } })) {
            return Err(CliError::Config(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }));
        }
    }

    Ok(StoreConfig::load_with_fallback(config_path)?)
}

fn init_logging(cli: &Cli, default_level: &str, json_logs: bool) {
    // Set log level based on CLI flags
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        default_level
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("benchhist={0},benchhist_store={0}", log_level).into());

    let json_layer = json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::{generate, Generator};
    use std::io;

    fn print_completions<G: Generator>(gen: G, cmd: &mut clap::Command) {
        generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    }

    let mut cmd = Cli::command();
    print_completions(shell, &mut cmd);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_output_format_conversion() {
        assert!(matches!(OutputFormat::from(OutputFormatArg::Table), OutputFormat::Table));
        assert!(matches!(OutputFormat::from(OutputFormatArg::Json), OutputFormat::Json));
        assert!(matches!(OutputFormat::from(OutputFormatArg::Csv), OutputFormat::Csv));
        assert!(matches!(OutputFormat::from(OutputFormatArg::Yaml), OutputFormat::Yaml));
        assert!(matches!(OutputFormat::from(OutputFormatArg::Raw), OutputFormat::Raw));
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["benchhist", "suites"]).unwrap();
        assert!(matches!(cli.command, Commands::Suites(_)));

        let cli = Cli::try_parse_from(["benchhist", "--verbose", "--format", "json", "latest", "premium/latency/read"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormatArg::Json));
        match cli.command {
            Commands::Latest(args) => assert_eq!(args.suite.as_str(), "premium/latency/read"),
            _ => panic!("expected latest"),
        }
    }

    #[test]
    fn test_metrics_flag_parsing() {
        let cli = Cli::try_parse_from(["benchhist", "check", "--all", "--metrics", "prometheus"]).unwrap();
        assert_eq!(cli.metrics.map(MetricsFormatArg::as_str), Some("prometheus"));
        assert!(Cli::try_parse_from(["benchhist", "suites", "--metrics", "xml"]).is_err());
    }

    #[test]
    fn test_invalid_suite_rejected_by_parser() {
        assert!(Cli::try_parse_from(["benchhist", "show", "../outside"]).is_err());
        assert!(Cli::try_parse_from(["benchhist", "check"]).is_err());
        assert!(Cli::try_parse_from(["benchhist", "check", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["benchhist", "check", "premium/latency/read", "--all"]).is_err());
    }
}
