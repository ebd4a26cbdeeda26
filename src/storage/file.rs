//! File-based storage backend.

use crate::error::{Error, Result};
use crate::storage::traits::StateStore;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// File-based storage backend with atomic writes.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileBackend {
    /// Create a new file backend storing the record under `key`.
    ///
    /// Creates the state directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created.
    pub fn new(base_dir: PathBuf, key: &str) -> Result<Self> {
        let dir = base_dir.join("state");
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join(format!("{key}.json")),
            quota_bytes: None,
        })
    }

    /// Reject writes whose serialized record exceeds `limit` bytes.
    #[must_use]
    pub fn with_quota(mut self, limit: Option<usize>) -> Self {
        self.quota_bytes = limit;
        self
    }

    /// Path of the record file.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStore for FileBackend {
    fn read(&self) -> Option<Value> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "discarding unreadable record");
                None
            }
        }
    }

    fn write(&self, record: &Value) -> Result<()> {
        let contents = serde_json::to_string(record)?;
        if let Some(limit) = self.quota_bytes {
            if contents.len() > limit {
                return Err(Error::QuotaExceeded {
                    needed: contents.len(),
                    limit,
                });
            }
        }

        // Write to temp file first
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, &contents)?;

        // Atomic rename
        fs::rename(&temp, &self.path)?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_backend() -> (FileBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().to_path_buf(), "session").unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn creates_state_directory() {
        let temp_dir = TempDir::new().unwrap();
        let _backend = FileBackend::new(temp_dir.path().to_path_buf(), "session").unwrap();
        assert!(temp_dir.path().join("state").exists());
    }

    #[test]
    fn read_missing_record() {
        let (store, _temp) = create_test_backend();
        assert!(store.read().is_none());
    }

    #[test]
    fn write_and_read_record() {
        let (store, _temp) = create_test_backend();
        let record = json!({"sessionId": "abc", "itemsInCart": 2});

        store.write(&record).unwrap();

        assert_eq!(store.read().unwrap(), record);
    }

    #[test]
    fn atomic_write_creates_no_temp_file() {
        let (store, temp_dir) = create_test_backend();

        store.write(&json!({"sessionId": "abc"})).unwrap();

        let temp_path = temp_dir.path().join("state").join("session.tmp");
        assert!(!temp_path.exists());
        assert!(store.path().exists());
    }

    #[test]
    fn corrupted_record_reads_as_empty() {
        let (store, _temp) = create_test_backend();
        fs::write(store.path(), "{ this is not valid json }").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn truncated_record_reads_as_empty() {
        let (store, _temp) = create_test_backend();
        fs::write(store.path(), r#"{"sessionId": "partial", "events": {"#).unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn quota_rejects_large_record_and_keeps_previous() {
        let (store, _temp) = create_test_backend();
        let store = store.with_quota(Some(64));
        let small = json!({"sessionId": "abc"});
        store.write(&small).unwrap();

        let large = json!({"sessionId": "x".repeat(200)});
        let err = store.write(&large).unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { limit: 64, .. }));
        assert_eq!(store.read().unwrap(), small);
    }

    #[test]
    fn clear_removes_file() {
        let (store, _temp) = create_test_backend();
        store.write(&json!({"sessionId": "abc"})).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
