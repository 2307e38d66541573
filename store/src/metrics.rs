//! Metrics for the benchmark history store
//!
//! Counters live in a private prometheus registry owned by the store and
//! can be exported as prometheus text or JSON.

use std::time::{Duration, Instant};

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::error::{HistoryError, Result};

/// Metrics collector for the history store
pub struct StoreMetrics {
    enabled: bool,
    registry: Registry,
    counters: StoreCounters,
    start_time: Instant,
}

#[derive(Clone)]
struct StoreCounters {
    runs_appended: IntCounter,
    append_failures: IntCounterVec,
    reads: IntCounter,
    suites_loaded: IntGauge,
    append_duration: Histogram,
}

/// Snapshot of the store counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub runs_appended: u64,
    pub append_failures: u64,
    pub reads: u64,
    pub suites_loaded: i64,
    /// Mean append latency in milliseconds
    pub avg_append_ms: f64,
    pub uptime: u64,
}

impl StoreMetrics {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let registry = Registry::new();
        let counters = StoreCounters::new(&registry)?;

        Ok(Self {
            enabled: config.enabled,
            registry,
            counters,
            start_time: Instant::now(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_append(&self, duration: Duration) {
        if self.enabled {
            self.counters.runs_appended.inc();
            self.counters.append_duration.observe(duration.as_secs_f64());
        }
    }

    pub fn record_append_failure(&self, error: &HistoryError) {
        if self.enabled {
            self.counters
                .append_failures
                .with_label_values(&[error.category()])
                .inc();
        }
    }

    pub fn record_read(&self) {
        if self.enabled {
            self.counters.reads.inc();
        }
    }

    pub fn set_suites_loaded(&self, count: usize) {
        if self.enabled {
            self.counters.suites_loaded.set(count as i64);
        }
    }

    pub fn stats(&self) -> StoreStats {
        let failures = self
            .registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "benchhist_append_failures_total")
            .flat_map(|family| family.get_metric().iter())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum();

        let count = self.counters.append_duration.get_sample_count();
        let avg_append_ms = if count > 0 {
            self.counters.append_duration.get_sample_sum() / count as f64 * 1000.0
        } else {
            0.0
        };

        StoreStats {
            runs_appended: self.counters.runs_appended.get(),
            append_failures: failures,
            reads: self.counters.reads.get(),
            suites_loaded: self.counters.suites_loaded.get(),
            avg_append_ms,
            uptime: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics as "prometheus" text or "json"
    pub fn export(&self, format: &str) -> Result<String> {
        match format {
            "prometheus" => {
                let mut buffer = Vec::new();
                TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
                String::from_utf8(buffer).map_err(|e| HistoryError::Metrics(e.to_string()))
            }
            "json" => Ok(serde_json::to_string_pretty(&self.stats())?),
            _ => Err(HistoryError::Metrics(format!("Unsupported format: {}", format))),
        }
    }
}

impl StoreCounters {
    fn new(registry: &Registry) -> Result<Self> {
        let runs_appended = IntCounter::new("benchhist_runs_appended_total", "Total number of runs appended")?;
        registry.register(Box::new(runs_appended.clone()))?;

        let append_failures = IntCounterVec::new(
            Opts::new("benchhist_append_failures_total", "Rejected or failed appends by error category"),
            &["category"],
        )?;
        registry.register(Box::new(append_failures.clone()))?;

        let reads = IntCounter::new("benchhist_reads_total", "Total number of history, latest and series reads")?;
        registry.register(Box::new(reads.clone()))?;

        let suites_loaded = IntGauge::new("benchhist_suites_loaded", "Suites currently held by the store")?;
        registry.register(Box::new(suites_loaded.clone()))?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new("benchhist_append_duration_seconds", "Append latency including persistence")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        Ok(Self {
            runs_appended,
            append_failures,
            reads,
            suites_loaded,
            append_duration,
        })
    }
}
