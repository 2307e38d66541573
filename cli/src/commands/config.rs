use crate::error::Result;
use crate::output::OutputManager;
use benchhist_store::error::ConfigError;
use benchhist_store::StoreConfig;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration action
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file, environment and flags applied)
    Show {
        /// Also print the configuration file path
        #[arg(long)]
        path: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path (defaults to the active one)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(args: ConfigArgs, config: &StoreConfig, config_path: &Path, output: &OutputManager) -> Result<()> {
    match args.action {
        ConfigAction::Show { path } => show_config(config, config_path, path, output),
        ConfigAction::Validate { file } => validate_config(file.as_deref().unwrap_or(config_path), output),
        ConfigAction::Init { force } => init_config(config_path, force, output),
    }
}

fn show_config(config: &StoreConfig, config_path: &Path, show_path: bool, output: &OutputManager) -> Result<()> {
    if show_path {
        let state = if config_path.exists() { "" } else { " (not present, using defaults)" };
        output.print_info(&format!("Configuration file: {}{}", config_path.display(), state))?;
    }

    output.print_config(config)
}

fn validate_config(path: &Path, output: &OutputManager) -> Result<()> {
    let config = StoreConfig::from_file(path)?;
    tracing::debug!("Validated configuration at {}: {:?}", path.display(), config.storage.backend);

    output.print_success(&format!("Configuration is valid: {}", path.display()))
}

fn init_config(path: &Path, force: bool, output: &OutputManager) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::ValidationFailed {
            reason: format!("{} already exists (use --force to overwrite)", path.display()),
        }
        .into());
    }

    StoreConfig::default().save_to_file(path)?;
    output.print_success(&format!("Wrote default configuration to {}", path.display()))
}
