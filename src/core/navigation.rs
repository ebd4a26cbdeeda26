//! Navigation detection without native route-change events.
//!
//! Every source of navigation (history push/replace, back/forward, hash
//! change) reports into one `NavigationHub`. The hub emits at most one
//! logical signal per location change: a report for the URL it just
//! signalled, inside the dedupe window, is dropped. That absorbs popstate
//! or hashchange echoing a history mutation and hosts that wrap the
//! history API more than once.

use crate::core::page::Location;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What reported the navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSource {
    /// Initial page load.
    Load,
    /// `history.pushState` after it took effect.
    PushState,
    /// `history.replaceState` after it took effect.
    ReplaceState,
    /// Browser back/forward.
    PopState,
    /// Fragment change.
    HashChange,
}

/// A logical navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSignal {
    /// Where the page is now.
    pub location: Location,

    /// What reported it.
    pub source: NavigationSource,

    /// Monotonic count of emitted signals.
    pub generation: u64,
}

/// Single notification point for navigation reports.
#[derive(Debug)]
pub struct NavigationHub {
    current: Location,
    dedupe_window: Duration,
    generation: u64,
    last_signal_at: Option<DateTime<Utc>>,
}

impl NavigationHub {
    /// Start at the page's initial location.
    #[must_use]
    pub fn new(initial: Location, dedupe_window_ms: i64) -> Self {
        Self {
            current: initial,
            dedupe_window: Duration::milliseconds(dedupe_window_ms),
            generation: 0,
            last_signal_at: None,
        }
    }

    /// Location of the most recent signal.
    #[must_use]
    pub fn current(&self) -> &Location {
        &self.current
    }

    /// Number of signals emitted so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that the page is now at `location`.
    ///
    /// Must be called after the location change took effect.
    pub fn observe(
        &mut self,
        source: NavigationSource,
        location: Location,
        now: DateTime<Utc>,
    ) -> Option<NavigationSignal> {
        let duplicate = location.href == self.current.href
            && self
                .last_signal_at
                .is_some_and(|at| now - at < self.dedupe_window);
        if duplicate {
            return None;
        }

        self.current = location;
        self.generation += 1;
        self.last_signal_at = Some(now);
        Some(NavigationSignal {
            location: self.current.clone(),
            source,
            generation: self.generation,
        })
    }
}
