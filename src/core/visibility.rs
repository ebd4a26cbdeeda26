//! Visible-time accounting.
//!
//! Time is only accrued while the page is `Visible`. Every transition,
//! navigation and heartbeat first settles the time since the last mark onto
//! the page that was active, then moves the mark.

use crate::core::page::PageKey;
use chrono::{DateTime, Utc};

/// Page visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Foreground.
    Visible,
    /// Background or minimized.
    Hidden,
}

/// Visible time owed to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accrual {
    /// Page the time belongs to.
    pub page: PageKey,
    /// Milliseconds spent visible on it.
    pub delta_ms: u64,
}

/// Two-state clock accruing visible time per page.
#[derive(Debug)]
pub struct VisibilityClock {
    state: Visibility,
    page: PageKey,
    mark: DateTime<Utc>,
}

impl VisibilityClock {
    /// Start visible on `page`.
    #[must_use]
    pub fn new(page: PageKey, now: DateTime<Utc>) -> Self {
        Self {
            state: Visibility::Visible,
            page,
            mark: now,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> Visibility {
        self.state
    }

    /// Page currently accruing.
    #[must_use]
    pub fn page(&self) -> &PageKey {
        &self.page
    }

    /// Begin accruing visible time on `page` from `now`, dropping anything
    /// unsettled.
    pub fn restart(&mut self, page: PageKey, now: DateTime<Utc>) {
        self.state = Visibility::Visible;
        self.page = page;
        self.mark = now;
    }

    /// Heartbeat: settle time so far without changing state.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Accrual> {
        self.settle(now)
    }

    /// Host reported a visibility change.
    pub fn transition(&mut self, to: Visibility, now: DateTime<Utc>) -> Option<Accrual> {
        let accrual = self.settle(now);
        self.state = to;
        accrual
    }

    /// Active page changed; time so far goes to the old page.
    pub fn switch_page(&mut self, page: PageKey, now: DateTime<Utc>) -> Option<Accrual> {
        let accrual = self.settle(now);
        self.page = page;
        accrual
    }

    fn settle(&mut self, now: DateTime<Utc>) -> Option<Accrual> {
        let elapsed = (now - self.mark).num_milliseconds();
        // A clock that went backwards must not move the mark back with it
        if elapsed < 0 {
            return None;
        }
        self.mark = now;
        if self.state == Visibility::Hidden || elapsed == 0 {
            return None;
        }
        Some(Accrual {
            page: self.page.clone(),
            delta_ms: elapsed.unsigned_abs(),
        })
    }
}
