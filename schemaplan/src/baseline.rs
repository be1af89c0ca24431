//! Drift baseline: the hash of the last schema an executor fully applied.
//!
//! This is the only mutable state around the planner. It is read freely, but
//! written only through [`BaselineStore::compare_and_swap`], so two concurrent
//! plan/apply cycles cannot both advance the same baseline.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BaselineError;
use crate::snapshot::Snapshot;

/// Persisted record of the last applied schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub schema_hash: String,
    pub applied_at: DateTime<Utc>,
}

impl Baseline {
    pub fn new(schema_hash: impl Into<String>) -> Self {
        Self {
            schema_hash: schema_hash.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Storage for the baseline pointer.
///
/// Implementations must make `compare_and_swap` atomic: the stored hash is
/// replaced only if it still equals `expected` (`None` meaning "no baseline yet").
pub trait BaselineStore {
    fn load(&self) -> Result<Option<Baseline>, BaselineError>;

    fn compare_and_swap(
        &mut self,
        expected: Option<&str>,
        next: Baseline,
    ) -> Result<(), BaselineError>;
}

/// Relationship between the stored baseline and a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftStatus {
    NoBaseline,
    InSync,
    Drifted { baseline: String, current: String },
}

/// Compare a snapshot against the stored baseline.
pub fn check_drift(
    store: &dyn BaselineStore,
    snapshot: &Snapshot,
) -> Result<DriftStatus, BaselineError> {
    Ok(match store.load()? {
        None => DriftStatus::NoBaseline,
        Some(baseline) if baseline.schema_hash == snapshot.schema_hash => DriftStatus::InSync,
        Some(baseline) => DriftStatus::Drifted {
            baseline: baseline.schema_hash,
            current: snapshot.schema_hash.clone(),
        },
    })
}

fn check_expected(expected: Option<&str>, current: Option<&Baseline>) -> Result<(), BaselineError> {
    let actual = current.map(|b| b.schema_hash.as_str());
    if actual != expected {
        return Err(BaselineError::Conflict {
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
        });
    }
    Ok(())
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    current: Option<Baseline>,
    /// Count of successful swaps
    pub swap_count: u64,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self) -> Result<Option<Baseline>, BaselineError> {
        Ok(self.current.clone())
    }

    fn compare_and_swap(
        &mut self,
        expected: Option<&str>,
        next: Baseline,
    ) -> Result<(), BaselineError> {
        check_expected(expected, self.current.as_ref())?;
        self.current = Some(next);
        self.swap_count += 1;
        Ok(())
    }
}

/// JSON file store. Writes go through a temp file and rename, under a lock file.
#[derive(Debug, Clone)]
pub struct FileBaselineStore {
    path: PathBuf,
}

impl FileBaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl BaselineStore for FileBaselineStore {
    fn load(&self) -> Result<Option<Baseline>, BaselineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn compare_and_swap(
        &mut self,
        expected: Option<&str>,
        next: Baseline,
    ) -> Result<(), BaselineError> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(&dir)?;

        let _lock = LockGuard::acquire(self.lock_path())?;

        let current = self.load()?;
        check_expected(expected, current.as_ref())?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(&next)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| BaselineError::Io(err.error))?;

        log::debug!(
            "baseline: {} -> {} ({})",
            expected.unwrap_or("<none>"),
            next.schema_hash,
            self.path.display()
        );
        Ok(())
    }
}

/// Exclusive lock file, removed on drop.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: PathBuf) -> Result<Self, BaselineError> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(BaselineError::Locked {
                    path: path.display().to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Model, SchemaModel};
    use crate::snapshot::make_snapshot;

    fn snapshot() -> Snapshot {
        let user = Model::new("User").with_field(Field::new("id", "String"));
        make_snapshot(SchemaModel::new().with_model(user)).unwrap()
    }

    #[test]
    fn test_memory_store_cas() {
        let mut store = MemoryBaselineStore::new();
        store.compare_and_swap(None, Baseline::new("sha256:a")).unwrap();
        store.compare_and_swap(Some("sha256:a"), Baseline::new("sha256:b")).unwrap();

        let stale = store.compare_and_swap(Some("sha256:a"), Baseline::new("sha256:c"));
        match stale {
            Err(BaselineError::Conflict { expected, actual }) => {
                assert_eq!(expected.as_deref(), Some("sha256:a"));
                assert_eq!(actual.as_deref(), Some("sha256:b"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.swap_count, 2);
    }

    #[test]
    fn test_first_write_requires_no_expectation() {
        let mut store = MemoryBaselineStore::new();
        let result = store.compare_and_swap(Some("sha256:a"), Baseline::new("sha256:b"));
        assert!(matches!(result, Err(BaselineError::Conflict { actual: None, .. })));
    }

    #[test]
    fn test_file_store_persists_and_guards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".schemaplan").join("baseline.json");
        let mut store = FileBaselineStore::new(path);
        assert_eq!(store.load().unwrap(), None);

        store.compare_and_swap(None, Baseline::new("sha256:a")).unwrap();
        let reopened = FileBaselineStore::new(store.path().to_path_buf());
        assert_eq!(reopened.load().unwrap().unwrap().schema_hash, "sha256:a");

        assert!(matches!(
            store.compare_and_swap(None, Baseline::new("sha256:b")),
            Err(BaselineError::Conflict { .. })
        ));
        assert!(!store.lock_path().exists());
    }

    #[test]
    fn test_file_store_reports_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBaselineStore::new(dir.path().join("baseline.json"));
        std::fs::write(store.lock_path(), b"").unwrap();

        let result = store.compare_and_swap(None, Baseline::new("sha256:a"));
        assert!(matches!(result, Err(BaselineError::Locked { .. })));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_drift_detection() {
        let snapshot = snapshot();
        let mut store = MemoryBaselineStore::new();
        assert_eq!(check_drift(&store, &snapshot).unwrap(), DriftStatus::NoBaseline);

        store
            .compare_and_swap(None, Baseline::new(snapshot.schema_hash.clone()))
            .unwrap();
        assert_eq!(check_drift(&store, &snapshot).unwrap(), DriftStatus::InSync);

        store
            .compare_and_swap(Some(&snapshot.schema_hash), Baseline::new("sha256:other"))
            .unwrap();
        assert!(matches!(
            check_drift(&store, &snapshot).unwrap(),
            DriftStatus::Drifted { .. }
        ));
    }
}
