//! Benchmark history store
//!
//! `BenchmarkHistoryStore` owns every suite it has touched. Each suite sits
//! behind its own `RwLock`, so appends to one suite are serialized while
//! reads and other suites proceed in parallel. Histories are shared as
//! `Arc<SuiteHistory>` snapshots; an append publishes a new snapshot and
//! never mutates one a reader may still hold.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::backend::{FileBackend, Loaded, MemoryBackend, SuiteBackend};
use crate::config::{BackendKind, StoreConfig, WriteMode};
use crate::error::{HistoryError, Result};
use crate::metrics::StoreMetrics;
use crate::model::{Run, SuiteHistory, SuiteId};
use crate::series::Series;
use crate::validation::{check_history, validate_run, Fingerprint, IntegrityReport};

/// Durable, queryable accumulation of runs per suite
pub struct BenchmarkHistoryStore {
    /// Persistence backend
    backend: Arc<dyn SuiteBackend>,

    /// Configuration
    config: StoreConfig,

    /// One slot per suite touched so far
    suites: RwLock<HashMap<SuiteId, Arc<RwLock<SuiteSlot>>>>,

    /// Metrics collector
    metrics: StoreMetrics,
}

/// In-memory state of one suite
#[derive(Debug, Default)]
struct SuiteSlot {
    /// Backend has been consulted
    loaded: bool,

    /// `None` while the suite has never been written
    history: Option<Arc<SuiteHistory>>,

    /// Fingerprint of the stored file this slot is based on
    fingerprint: Option<Fingerprint>,

    /// Appended runs not yet persisted (deferred mode)
    dirty: bool,
}

impl SuiteSlot {
    fn from_loaded(loaded: Loaded) -> Self {
        Self {
            loaded: true,
            history: Some(Arc::new(loaded.history)),
            fingerprint: Some(loaded.fingerprint),
            dirty: false,
        }
    }

    fn snapshot(&self, suite: &SuiteId) -> Result<Arc<SuiteHistory>> {
        self.history.clone().ok_or_else(|| HistoryError::not_found(suite))
    }
}

impl BenchmarkHistoryStore {
    /// Open a store on the backend named by `storage.backend`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn SuiteBackend> = match config.storage.backend {
            BackendKind::File => Arc::new(FileBackend::from_config(&config.storage)),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };

        Self::with_backend(backend, config)
    }

    /// Open a store on an injected backend
    pub fn with_backend(backend: Arc<dyn SuiteBackend>, config: &StoreConfig) -> Result<Self> {
        let metrics = StoreMetrics::new(&config.metrics)?;

        tracing::info!(
            "Opened benchmark history store on {} backend ({:?} writes)",
            backend.name(),
            config.storage.write_mode
        );

        Ok(Self {
            backend,
            config: config.clone(),
            suites: RwLock::new(HashMap::new()),
            metrics,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Validate `run` and append it to `suite`, creating the suite if needed.
    ///
    /// In write-through mode the new history is persisted before it becomes
    /// visible, so a failed write leaves the suite untouched.
    pub async fn append_run(&self, suite: &SuiteId, run: Run) -> Result<()> {
        let started = Instant::now();

        match self.append_inner(suite, run).await {
            Ok(()) => {
                self.metrics.record_append(started.elapsed());
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Append to {} rejected ({}): {}", suite, e.category(), e);
                self.metrics.record_append_failure(&e);
                Err(e)
            }
        }
    }

    async fn append_inner(&self, suite: &SuiteId, run: Run) -> Result<()> {
        validate_run(&run, &self.config.validation)?;

        let slot = self.slot(suite).await;
        let mut slot = slot.write().await;
        self.ensure_loaded(suite, &mut slot).await?;

        let created = slot.history.is_none();
        let date = run.date;
        match self.config.storage.write_mode {
            WriteMode::WriteThrough => {
                let mut next = match &slot.history {
                    Some(history) => SuiteHistory::clone(history),
                    None => SuiteHistory::new(self.repo_url_for(&run)),
                };
                next.push_run(run);

                match self.backend.save(suite, &next, slot.fingerprint.as_ref()).await {
                    Ok(fingerprint) => {
                        slot.fingerprint = Some(fingerprint);
                        slot.history = Some(Arc::new(next));
                    }
                    Err(e) => {
                        if matches!(e, HistoryError::ConcurrencyConflict { .. }) {
                            // reload on next access
                            slot.loaded = false;
                        }
                        return Err(e);
                    }
                }
            }
            WriteMode::Deferred => {
                let repo_url = self.repo_url_for(&run);
                let history = slot
                    .history
                    .get_or_insert_with(|| Arc::new(SuiteHistory::new(repo_url)));
                Arc::make_mut(history).push_run(run);
                slot.dirty = true;
            }
        }

        if created {
            tracing::info!("Created suite {}", suite);
        }
        tracing::debug!("Appended run dated {} to {}", date, suite);
        Ok(())
    }

    /// Full history of a suite
    pub async fn get_history(&self, suite: &SuiteId) -> Result<SuiteHistory> {
        let history = self.snapshot(suite).await?;
        Ok(SuiteHistory::clone(&history))
    }

    /// Run with the greatest date, the last inserted one on ties
    pub async fn get_latest(&self, suite: &SuiteId) -> Result<Run> {
        let history = self.snapshot(suite).await?;
        history.latest().cloned().ok_or_else(|| HistoryError::not_found(suite))
    }

    /// `(date, value)` samples of one bench, in date order
    pub async fn get_series(&self, suite: &SuiteId, bench: &str) -> Result<Series> {
        let history = self.snapshot(suite).await?;
        Ok(Series::new(suite.clone(), bench, history))
    }

    /// Distinct bench names of a suite in first-seen order
    pub async fn bench_names(&self, suite: &SuiteId) -> Result<Vec<String>> {
        let history = self.snapshot(suite).await?;
        Ok(history.bench_names())
    }

    /// Run the integrity checks over a suite
    pub async fn check_suite(&self, suite: &SuiteId) -> Result<IntegrityReport> {
        let history = self.snapshot(suite).await?;
        let report = check_history(suite.as_str(), &history);

        for failure in report.failures() {
            tracing::warn!("Suite {} failed check {}: {} problem(s)", suite, failure.name, failure.errors.len());
        }

        Ok(report)
    }

    /// Stored suites plus suites created in memory but not yet flushed
    pub async fn list_suites(&self) -> Result<Vec<SuiteId>> {
        let mut suites: BTreeSet<SuiteId> = self.backend.list().await?.into_iter().collect();

        let slots: Vec<(SuiteId, Arc<RwLock<SuiteSlot>>)> = self
            .suites
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();

        for (id, slot) in slots {
            if slot.read().await.history.is_some() {
                suites.insert(id);
            }
        }

        Ok(suites.into_iter().collect())
    }

    /// Persist every dirty suite, returning how many were written
    pub async fn flush(&self) -> Result<usize> {
        let mut slots: Vec<(SuiteId, Arc<RwLock<SuiteSlot>>)> = self
            .suites
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));

        let mut written = 0;
        for (suite, slot) in slots {
            let mut slot = slot.write().await;
            if !slot.dirty {
                continue;
            }

            let Some(history) = slot.history.clone() else {
                continue;
            };

            let fingerprint = self.backend.save(&suite, &history, slot.fingerprint.as_ref()).await?;
            slot.fingerprint = Some(fingerprint);
            slot.dirty = false;
            written += 1;
        }

        if written > 0 {
            tracing::info!("Flushed {} suite(s)", written);
        }
        Ok(written)
    }

    /// Flush pending writes and drop the store
    pub async fn close(self) -> Result<()> {
        let written = self.flush().await?;
        tracing::info!("Closed benchmark history store ({} suite(s) flushed)", written);
        Ok(())
    }

    /// Slot for a suite about to be written, registered if new
    async fn slot(&self, suite: &SuiteId) -> Arc<RwLock<SuiteSlot>> {
        if let Some(slot) = self.suites.read().await.get(suite) {
            return slot.clone();
        }

        let mut suites = self.suites.write().await;
        let slot = suites.entry(suite.clone()).or_default().clone();
        self.metrics.set_suites_loaded(suites.len());
        slot
    }

    async fn ensure_loaded(&self, suite: &SuiteId, slot: &mut SuiteSlot) -> Result<()> {
        if slot.loaded {
            return Ok(());
        }

        match self.backend.load(suite).await? {
            Some(loaded) => {
                tracing::debug!("Loaded suite {} with {} runs", suite, loaded.history.len());
                slot.history = Some(Arc::new(loaded.history));
                slot.fingerprint = Some(loaded.fingerprint);
            }
            None => {
                slot.history = None;
                slot.fingerprint = None;
            }
        }

        slot.dirty = false;
        slot.loaded = true;
        Ok(())
    }

    async fn snapshot(&self, suite: &SuiteId) -> Result<Arc<SuiteHistory>> {
        self.metrics.record_read();

        let existing = self.suites.read().await.get(suite).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                // Reads register a slot only for suites that exist
                let Some(loaded) = self.backend.load(suite).await? else {
                    return Err(HistoryError::not_found(suite));
                };
                tracing::debug!("Loaded suite {} with {} runs", suite, loaded.history.len());

                let mut suites = self.suites.write().await;
                let slot = suites
                    .entry(suite.clone())
                    .or_insert_with(|| Arc::new(RwLock::new(SuiteSlot::from_loaded(loaded))))
                    .clone();
                self.metrics.set_suites_loaded(suites.len());
                slot
            }
        };

        {
            let guard = slot.read().await;
            if guard.loaded {
                return guard.snapshot(suite);
            }
        }

        let mut guard = slot.write().await;
        self.ensure_loaded(suite, &mut guard).await?;
        guard.snapshot(suite)
    }

    fn repo_url_for(&self, run: &Run) -> String {
        self.config
            .storage
            .repo_url
            .clone()
            .or_else(|| run.commit.repo_url().map(str::to_string))
            .unwrap_or_default()
    }
}
