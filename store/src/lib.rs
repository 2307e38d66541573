//! Benchmark history store library
//!
//! This library keeps continuous-benchmark results as one `data.js` file per
//! suite and provides an async store that validates and appends runs and
//! answers history, latest-run and per-bench series queries.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod series;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use backend::{FileBackend, Loaded, MemoryBackend, SuiteBackend};
pub use config::{BackendKind, StoreConfig, WriteMode};
pub use error::{HistoryError, Result, ValidationError};
pub use metrics::{StoreMetrics, StoreStats};
pub use model::{Bench, Commit, Person, Run, SuiteHistory, SuiteId, Tool};
pub use series::{Series, SeriesPoint};
pub use store::BenchmarkHistoryStore;
pub use validation::{check_history, validate_run, CheckResult, Fingerprint, IntegrityReport, Severity};
