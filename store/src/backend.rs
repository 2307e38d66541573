//! Persistence backends for suite histories
//!
//! A backend stores one rendered `data.js` document per suite and reports a
//! fingerprint of what it holds, so the store can notice writers that
//! bypassed it.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use walkdir::WalkDir;

use crate::codec;
use crate::config::StorageConfig;
use crate::error::{HistoryError, Result, StorageError};
use crate::model::{SuiteHistory, SuiteId};
use crate::validation::{fingerprint, Fingerprint};

/// A suite as read from a backend
#[derive(Debug, Clone)]
pub struct Loaded {
    pub history: SuiteHistory,
    pub fingerprint: Fingerprint,
}

#[async_trait]
pub trait SuiteBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read a suite, `None` if it has never been written
    async fn load(&self, suite: &SuiteId) -> Result<Option<Loaded>>;

    /// Replace a suite. `expected` is the fingerprint the caller last saw
    /// (`None` if the suite did not exist); a mismatch is a conflict.
    async fn save(
        &self,
        suite: &SuiteId,
        history: &SuiteHistory,
        expected: Option<&Fingerprint>,
    ) -> Result<Fingerprint>;

    /// Every stored suite, sorted
    async fn list(&self) -> Result<Vec<SuiteId>>;
}

fn ensure_unchanged(
    suite: &SuiteId,
    expected: Option<&Fingerprint>,
    current: Option<&Fingerprint>,
) -> Result<()> {
    match (expected, current) {
        (None, None) => Ok(()),
        (Some(expected), Some(current)) if expected == current => Ok(()),
        _ => {
            tracing::warn!("Suite {} changed since it was loaded", suite);
            Err(HistoryError::ConcurrencyConflict { suite: suite.to_string() })
        }
    }
}

/// Directory tree with one `<root>/<suite>/<file_name>` per suite
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    file_name: String,
    atomic_writes: bool,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_name: "data.js".to_string(),
            atomic_writes: true,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: config.root_path.clone(),
            file_name: config.file_name.clone(),
            atomic_writes: config.atomic_writes,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding a suite
    pub fn suite_path(&self, suite: &SuiteId) -> PathBuf {
        self.root.join(suite.to_relative_path()).join(&self.file_name)
    }

    async fn read_current(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                path: path.to_string_lossy().to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let write_failed = |e: io::Error| StorageError::WriteFailed {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        };

        if !self.atomic_writes {
            tokio::fs::write(path, content).await.map_err(write_failed)?;
            return Ok(());
        }

        let temp_path = path.with_file_name(format!(".{}.{}.tmp", self.file_name, std::process::id()));
        tokio::fs::write(&temp_path, content).await.map_err(write_failed)?;

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(write_failed(e).into());
        }

        Ok(())
    }
}

#[async_trait]
impl SuiteBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, suite: &SuiteId) -> Result<Option<Loaded>> {
        let path = self.suite_path(suite);
        let Some(content) = self.read_current(&path).await? else {
            return Ok(None);
        };

        let history = codec::decode(&content).map_err(|e| StorageError::InvalidFormat {
            path: path.to_string_lossy().to_string(),
            reason: e.reason,
        })?;

        tracing::debug!("Loaded {} runs for {} from {}", history.len(), suite, path.display());
        Ok(Some(Loaded {
            history,
            fingerprint: fingerprint(content.as_bytes()),
        }))
    }

    async fn save(
        &self,
        suite: &SuiteId,
        history: &SuiteHistory,
        expected: Option<&Fingerprint>,
    ) -> Result<Fingerprint> {
        let path = self.suite_path(suite);

        let current = self.read_current(&path).await?;
        let current = current.map(|content| fingerprint(content.as_bytes()));
        ensure_unchanged(suite, expected, current.as_ref())?;

        let content = codec::encode(history)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| StorageError::DirectoryCreationFailed {
                    path: parent.to_string_lossy().to_string(),
                })?;
        }

        self.write_file(&path, &content).await?;

        tracing::info!("Wrote {} runs to {}", history.len(), path.display());
        Ok(fingerprint(content.as_bytes()))
    }

    async fn list(&self) -> Result<Vec<SuiteId>> {
        let root = self.root.clone();
        let file_name = self.file_name.clone();

        let suites = tokio::task::spawn_blocking(move || scan_suites(&root, &file_name))
            .await
            .map_err(|e| HistoryError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        Ok(suites)
    }
}

fn scan_suites(root: &Path, file_name: &str) -> Vec<SuiteId> {
    let mut suites = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    for entry in walker.filter_map(|entry| entry.ok()) {
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy() != file_name {
            continue;
        }

        let Some(dir) = entry.path().parent().and_then(|parent| parent.strip_prefix(root).ok()) else {
            continue;
        };

        let id = dir
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if id.is_empty() {
            continue;
        }

        match SuiteId::new(id) {
            Ok(suite) => suites.push(suite),
            Err(e) => tracing::warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    suites.sort();
    suites
}

#[derive(Debug, Clone)]
struct StoredSuite {
    content: String,
    fingerprint: Fingerprint,
}

/// Process-local backend holding rendered suite files
#[derive(Debug, Default)]
pub struct MemoryBackend {
    suites: RwLock<HashMap<SuiteId, StoredSuite>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw file content, bypassing conflict detection
    pub async fn put_raw(&self, suite: &SuiteId, content: impl Into<String>) {
        let content = content.into();
        let stored = StoredSuite {
            fingerprint: fingerprint(content.as_bytes()),
            content,
        };
        self.suites.write().await.insert(suite.clone(), stored);
    }

    /// Raw file content of a suite
    pub async fn get_raw(&self, suite: &SuiteId) -> Option<String> {
        self.suites.read().await.get(suite).map(|stored| stored.content.clone())
    }
}

#[async_trait]
impl SuiteBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, suite: &SuiteId) -> Result<Option<Loaded>> {
        let suites = self.suites.read().await;
        let Some(stored) = suites.get(suite) else {
            return Ok(None);
        };

        let history = codec::decode(&stored.content).map_err(|e| StorageError::InvalidFormat {
            path: format!("memory:{}", suite),
            reason: e.reason,
        })?;

        Ok(Some(Loaded {
            history,
            fingerprint: stored.fingerprint.clone(),
        }))
    }

    async fn save(
        &self,
        suite: &SuiteId,
        history: &SuiteHistory,
        expected: Option<&Fingerprint>,
    ) -> Result<Fingerprint> {
        let content = codec::encode(history)?;
        let mut suites = self.suites.write().await;

        ensure_unchanged(suite, expected, suites.get(suite).map(|stored| &stored.fingerprint))?;

        let stored = StoredSuite {
            fingerprint: fingerprint(content.as_bytes()),
            content,
        };
        let result = stored.fingerprint.clone();
        suites.insert(suite.clone(), stored);

        Ok(result)
    }

    async fn list(&self) -> Result<Vec<SuiteId>> {
        let mut suites: Vec<SuiteId> = self.suites.read().await.keys().cloned().collect();
        suites.sort();
        Ok(suites)
    }
}
