//! `cartpulse reset` command implementation.

use crate::cli::open_store;
use crate::config::load_config;
use crate::core::SessionModel;
use crate::error::Result;
use std::sync::Arc;

/// Run the reset command.
///
/// Drops the persisted record; the next run starts a new session.
///
/// # Errors
///
/// Returns an error if the store cannot be cleared.
pub fn run() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let path = store.path().clone();

    SessionModel::new(Arc::new(store)).reset()?;
    println!("Cleared session record at {}", path.display());
    Ok(())
}
