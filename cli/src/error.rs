use benchhist_store::error::ConfigError;
use benchhist_store::HistoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Store(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{failed} of {checked} suite(s) failed integrity checks")]
    CheckFailed { failed: usize, checked: usize },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Store(e) => match e {
                HistoryError::Validation(_) | HistoryError::InvalidSuiteId { .. } => 2,
                HistoryError::NotFound { .. } => 4,
                HistoryError::ConcurrencyConflict { .. } => 5,
                HistoryError::Config(_) => 1,
                HistoryError::Io(_) | HistoryError::Storage(_) => 6,
                _ => 1,
            },
            CliError::Config(_) => 1,
            CliError::Io(_) => 6,
            CliError::Json(_) | CliError::InvalidInput(_) => 2,
            CliError::CheckFailed { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Format error for user-friendly display
pub fn format_error(error: &CliError) -> String {
    match error {
        CliError::Store(HistoryError::Validation(e)) => {
            format!("Run rejected: {}\n\nNothing was written. Fix the run JSON and try again.", e)
        }
        CliError::Store(HistoryError::NotFound { suite }) => {
            format!("Suite not found: {}\n\nRun 'benchhist suites' to list the suites under the root.", suite)
        }
        CliError::Store(HistoryError::ConcurrencyConflict { suite }) => {
            format!(
                "Conflict: {} was modified by another writer.\n\nThe append was not applied; re-run the command to retry.",
                suite
            )
        }
        CliError::Store(HistoryError::Storage(e)) => {
            format!("Storage Error: {}\n\nCheck that --root points at the benchmark data directory.", e)
        }
        CliError::Config(e) | CliError::Store(HistoryError::Config(e)) => {
            format!("Configuration Error: {}\n\nTry running 'benchhist config show' to check your configuration.", e)
        }
        CliError::Json(e) => {
            format!("Invalid run JSON: {}\n\nExpected one object with commit, date, tool and benches.", e)
        }
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchhist_store::ValidationError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::from(HistoryError::from(ValidationError::EmptyBenches)).exit_code(), 2);
        assert_eq!(CliError::from(HistoryError::not_found("premium/latency/read")).exit_code(), 4);
        assert_eq!(
            CliError::from(HistoryError::ConcurrencyConflict { suite: "a".to_string() }).exit_code(),
            5
        );
        assert_eq!(CliError::CheckFailed { failed: 1, checked: 2 }.exit_code(), 3);
        assert_eq!(
            CliError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).exit_code(),
            6
        );
    }

    #[test]
    fn test_format_error_hints() {
        let message = format_error(&CliError::from(HistoryError::not_found("X86/disk/read")));
        assert!(message.contains("Suite not found: X86/disk/read"));
        assert!(message.contains("benchhist suites"));
    }
}
