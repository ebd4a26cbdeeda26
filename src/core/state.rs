//! Session record and event types.

use crate::core::page::{PageCategory, PageKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The durable unit persisted under the fixed storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Stable for the lifetime of the persisted record.
    pub session_id: String,

    /// Events grouped by page, chronological within each page.
    pub events: BTreeMap<PageKey, Vec<Event>>,

    /// Accumulated visible milliseconds per page.
    pub time_on_page: BTreeMap<PageKey, u64>,

    /// Last reconciled cart item count.
    pub items_in_cart: u64,
}

impl SessionRecord {
    /// Create an empty record with a fresh session id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_id(&Uuid::new_v4().to_string())
    }

    /// Create an empty record with a known session id.
    #[must_use]
    pub fn with_session_id(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            events: BTreeMap::new(),
            time_on_page: BTreeMap::new(),
            items_in_cart: 0,
        }
    }

    /// Rebuild a record from whatever JSON the store held.
    ///
    /// Each field is taken if it has the right shape and replaced with its
    /// default otherwise. Returns the record and whether anything had to be
    /// repaired. A missing session id is regenerated, so repair is not
    /// idempotent with respect to the original bytes.
    #[must_use]
    pub fn repair(raw: Value) -> (Self, bool) {
        let Value::Object(mut map) = raw else {
            return (Self::new(), true);
        };
        let mut repaired = false;

        let session_id = match map.remove("sessionId") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => {
                repaired = true;
                Uuid::new_v4().to_string()
            }
        };

        let events = match map.remove("events") {
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value).unwrap_or_else(|_| {
                    repaired = true;
                    BTreeMap::new()
                })
            }
            _ => {
                repaired = true;
                BTreeMap::new()
            }
        };

        let time_on_page = match map.remove("timeOnPage") {
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value).unwrap_or_else(|_| {
                    repaired = true;
                    BTreeMap::new()
                })
            }
            _ => {
                repaired = true;
                BTreeMap::new()
            }
        };

        let items_in_cart = match map.remove("itemsInCart").as_ref().and_then(Value::as_u64) {
            Some(count) => count,
            None => {
                repaired = true;
                0
            }
        };

        (
            Self {
                session_id,
                events,
                time_on_page,
                items_in_cart,
            },
            repaired,
        )
    }

    /// Sum of all bucket lengths.
    #[must_use]
    pub fn total_event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Total visible milliseconds across all pages.
    #[must_use]
    pub fn total_time_ms(&self) -> u64 {
        self.time_on_page.values().sum()
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// One captured interaction.
///
/// Carries denormalized context so the collector can use it standalone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type (`page_view`, `click`, `visibility`, ...).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds.
    pub ts: i64,

    /// Page URL at capture time.
    pub url: String,

    /// Session the event belongs to.
    pub session_id: String,

    /// Category of the page at capture time.
    pub page_type: PageCategory,

    /// Host user-agent string.
    pub ua: String,

    /// Type-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Event type names used by the agent.
pub mod event_type {
    /// First event of a page load.
    pub const SESSION_START: &str = "session_start";
    /// Page (or route) became current.
    pub const PAGE_VIEW: &str = "page_view";
    /// Classified click.
    pub const CLICK: &str = "click";
    /// Foreground/background change.
    pub const VISIBILITY: &str = "visibility";
    /// Interstitial surfaced.
    pub const PROMPT_SHOWN: &str = "prompt_shown";
    /// Shopper answered the interstitial.
    pub const PROMPT_ACTION: &str = "prompt_action";
    /// Page is being discarded.
    pub const UNLOAD: &str = "unload";
}
