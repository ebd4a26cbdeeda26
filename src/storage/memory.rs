//! In-memory storage backend for testing.

use crate::error::{Error, Result};
use crate::storage::traits::StateStore;
use serde_json::Value;
use std::sync::RwLock;

/// In-memory storage backend for testing.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    record: RwLock<Option<Value>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects records larger than `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            record: RwLock::default(),
            quota_bytes: Some(limit),
        }
    }

    /// Seed the backend with raw contents, valid or not.
    #[must_use]
    pub fn with_raw(value: Value) -> Self {
        Self {
            record: RwLock::new(Some(value)),
            quota_bytes: None,
        }
    }
}

impl StateStore for MemoryBackend {
    fn read(&self) -> Option<Value> {
        self.record.read().ok()?.clone()
    }

    fn write(&self, record: &Value) -> Result<()> {
        if let Some(limit) = self.quota_bytes {
            let needed = serde_json::to_string(record)?.len();
            if needed > limit {
                return Err(Error::QuotaExceeded { needed, limit });
            }
        }
        let mut slot = self
            .record
            .write()
            .map_err(|e| Error::Storage(std::io::Error::other(e.to_string())))?;
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .record
            .write()
            .map_err(|e| Error::Storage(std::io::Error::other(e.to_string())))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_missing_record() {
        let store = MemoryBackend::new();
        assert!(store.read().is_none());
    }

    #[test]
    fn write_replaces_whole_record() {
        let store = MemoryBackend::new();
        store.write(&json!({"sessionId": "a", "itemsInCart": 1})).unwrap();
        store.write(&json!({"sessionId": "b"})).unwrap();

        assert_eq!(store.read().unwrap(), json!({"sessionId": "b"}));
    }

    #[test]
    fn quota_exceeded_is_reported() {
        let store = MemoryBackend::with_quota(16);
        let err = store
            .write(&json!({"sessionId": "a-much-longer-session-id"}))
            .unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { limit: 16, .. }));
        assert!(store.read().is_none());
    }

    #[test]
    fn clear_drops_record() {
        let store = MemoryBackend::with_raw(json!({"sessionId": "a"}));
        store.clear().unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn concurrent_read_write() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryBackend::new());
        let mut handles = vec![];

        for i in 0..5 {
            let store_clone = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..20 {
                    store_clone
                        .write(&json!({"sessionId": format!("w-{i}-{j}")}))
                        .unwrap();
                    let _ = store_clone.read();
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert!(store.read().is_some());
    }
}
