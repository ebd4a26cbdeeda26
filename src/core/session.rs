//! Typed access to the persisted session record.
//!
//! `SessionModel` is the only component allowed to write the store. Every
//! mutation is a read-modify-write of the full record within one call.

use crate::core::page::PageKey;
use crate::core::state::{Event, SessionRecord};
use crate::error::Result;
use crate::storage::StateStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed view over the persisted record.
pub struct SessionModel {
    store: Arc<dyn StateStore>,
    /// Last record that failed to persist, served until a write succeeds.
    unsaved: Option<SessionRecord>,
}

impl SessionModel {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            unsaved: None,
        }
    }

    /// Whether the last write failed and state is held in memory only.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.unsaved.is_some()
    }

    /// Load the record, repairing and persisting defaults when needed.
    pub fn ensure(&mut self) -> SessionRecord {
        if let Some(record) = &self.unsaved {
            return record.clone();
        }
        match self.store.read() {
            Some(raw) => {
                let (record, repaired) = SessionRecord::repair(raw);
                if repaired {
                    debug!(session_id = %record.session_id, "repaired persisted record");
                    self.save(&record);
                }
                record
            }
            None => {
                let record = SessionRecord::new();
                debug!(session_id = %record.session_id, "initialized new session record");
                self.save(&record);
                record
            }
        }
    }

    /// Append an event to the page's bucket and persist.
    pub fn record_event(&mut self, page: &PageKey, event: Event) -> Event {
        let mut record = self.ensure();
        record
            .events
            .entry(page.clone())
            .or_default()
            .push(event.clone());
        self.save(&record);
        event
    }

    /// Add visible time to the page's bucket and persist.
    pub fn accumulate_time(&mut self, page: &PageKey, delta_ms: u64) {
        if delta_ms == 0 {
            return;
        }
        let mut record = self.ensure();
        *record.time_on_page.entry(page.clone()).or_insert(0) += delta_ms;
        self.save(&record);
    }

    /// Set the reconciled cart item count and persist.
    pub fn set_items_in_cart(&mut self, count: u64) {
        let mut record = self.ensure();
        record.items_in_cart = count;
        self.save(&record);
    }

    /// Sum of all bucket lengths, read fresh.
    pub fn total_event_count(&mut self) -> usize {
        self.ensure().total_event_count()
    }

    /// Empty the event buckets, and the time buckets unless `keep_time_on_page`.
    ///
    /// Session id and cart count are untouched.
    pub fn clear_events(&mut self, keep_time_on_page: bool) {
        let mut record = self.ensure();
        record.events.clear();
        if !keep_time_on_page {
            record.time_on_page.clear();
        }
        self.save(&record);
    }

    /// Drop the persisted record entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn reset(&mut self) -> Result<()> {
        self.unsaved = None;
        self.store.clear()
    }

    /// Persist, degrading to memory-only on failure.
    fn save(&mut self, record: &SessionRecord) {
        let result: Result<()> = serde_json::to_value(record)
            .map_err(Into::into)
            .and_then(|raw| self.store.write(&raw));
        match result {
            Ok(()) => self.unsaved = None,
            Err(e) => {
                warn!(error = %e, "failed to persist session record, keeping it in memory");
                self.unsaved = Some(record.clone());
            }
        }
    }
}
