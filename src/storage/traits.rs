//! Storage trait definitions.

use crate::error::Result;
use serde_json::Value;

/// Durable key/value container for the single session record.
///
/// Writes replace the whole record; there is no merge at this layer and no
/// cross-process coordination. Two processes sharing a backend can lose
/// each other's read-modify-write updates.
pub trait StateStore: Send + Sync {
    /// Read the raw persisted record.
    ///
    /// Missing or unparseable data yields `None`; this never fails outward.
    fn read(&self) -> Option<Value>;

    /// Replace the persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, including
    /// [`Error::QuotaExceeded`](crate::Error::QuotaExceeded) when the
    /// serialized record is larger than the backend allows.
    fn write(&self, record: &Value) -> Result<()>;

    /// Remove the persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn clear(&self) -> Result<()>;
}
