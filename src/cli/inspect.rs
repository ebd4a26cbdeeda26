//! `cartpulse inspect` command implementation.

use crate::cli::open_store;
use crate::config::load_config;
use crate::core::SessionRecord;
use crate::error::{Error, Result};
use crate::storage::StateStore;
use std::fmt::Write as _;

/// Run the inspect command.
///
/// Prints the persisted record as JSON, or a per-page summary.
///
/// # Errors
///
/// Returns an error if the storage backend fails or no record exists.
pub fn run(summary: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let record = load_record(&store)?;

    if summary {
        print!("{}", format_summary(&record));
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

/// Read and repair the record without writing anything back.
fn load_record(store: &dyn StateStore) -> Result<SessionRecord> {
    let raw = store.read().ok_or(Error::RecordNotFound)?;
    Ok(SessionRecord::repair(raw).0)
}

/// Human-readable per-page table.
fn format_summary(record: &SessionRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session:       {}", record.session_id);
    let _ = writeln!(out, "Items in cart: {}", record.items_in_cart);
    let _ = writeln!(out, "Buffered:      {} event(s)", record.total_event_count());
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<48} {:>8} {:>10}", "Page", "Events", "Visible");
    let _ = writeln!(out, "{}", "─".repeat(68));

    let mut pages: Vec<_> = record
        .events
        .keys()
        .chain(record.time_on_page.keys())
        .collect();
    pages.sort();
    pages.dedup();

    for page in pages {
        let events = record.events.get(page).map_or(0, Vec::len);
        let visible = record.time_on_page.get(page).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "{:<48} {:>8} {:>9}s",
            page.as_str(),
            events,
            visible / 1_000
        );
    }
    out
}
