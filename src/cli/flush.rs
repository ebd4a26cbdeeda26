//! `cartpulse flush` command implementation.

use crate::cli::{block_on, open_store};
use crate::config::{Config, load_config};
use crate::core::{FlushOutcome, FlushReason, SessionModel, Transport};
use crate::error::{Error, Result};
use crate::http::{HttpClient, ReqwestClient};
use crate::storage::StateStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Run the flush command.
///
/// Sends the persisted record to the collector once, outside the agent loop.
///
/// # Errors
///
/// Returns an error if there is no record or the collector call fails.
pub fn run() -> Result<()> {
    let config = load_config()?;
    let store: Arc<dyn StateStore> = Arc::new(open_store(&config)?);
    let http = Arc::new(ReqwestClient::new(Duration::from_secs(10))?);

    let endpoint = config.collector.endpoint();

    let outcome = block_on(async move { Ok(flush_once(&config, store, http).await) })?;
    match outcome {
        FlushOutcome::Sent { events, cleared } => {
            let suffix = if cleared { ", buffer cleared" } else { "" };
            println!("Sent {events} event(s) to {endpoint}{suffix}");
            Ok(())
        }
        FlushOutcome::Skipped => {
            println!("Nothing to send");
            Ok(())
        }
        FlushOutcome::Failed(e) => Err(e),
    }
}

/// One manual flush. A missing record is reported rather than created.
async fn flush_once(
    config: &Config,
    store: Arc<dyn StateStore>,
    http: Arc<dyn HttpClient>,
) -> FlushOutcome {
    if store.read().is_none() {
        return FlushOutcome::Failed(Error::RecordNotFound);
    }
    let mut model = SessionModel::new(store);
    let mut transport = Transport::new(
        &config.collector.endpoint(),
        config.collector.clear_after_send,
        http,
    );
    transport
        .flush(FlushReason::Manual, &mut model, Utc::now())
        .await
}
