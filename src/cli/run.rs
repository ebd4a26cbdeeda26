//! `cartpulse run` command implementation.

use crate::cli::{block_on, open_store};
use crate::config::load_config;
use crate::core::{Agent, AgentDeps};
use crate::error::{Error, Result};
use crate::host::HostSignal;
use crate::http::ReqwestClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

/// Request timeout for collector, decision and cart calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Signals buffered between the stdin reader and the agent.
const SIGNAL_BUFFER: usize = 64;

/// Run the agent.
///
/// Reads newline-delimited host signals from stdin and drives the agent
/// until an `unload` signal or EOF. Prompts are written to stdout.
///
/// # Errors
///
/// Returns an error if the config, storage, or HTTP client cannot be set up.
pub fn run() -> Result<()> {
    let config = load_config()?;
    let store = Arc::new(open_store(&config)?);
    let http = Arc::new(ReqwestClient::new(HTTP_TIMEOUT)?);

    block_on(async move {
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        tokio::spawn(read_signals(tx));

        let agent = Agent::new(config, AgentDeps::new(store, http));
        agent.run(rx).await;
        Ok(())
    })
}

/// Forward each parseable stdin line to the agent.
async fn read_signals(tx: mpsc::Sender<HostSignal>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_signal(&line) {
            Ok(signal) => {
                if tx.send(signal).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "ignoring signal"),
        }
    }
}

/// Parse one signal line.
fn parse_signal(line: &str) -> Result<HostSignal> {
    serde_json::from_str(line).map_err(|e| Error::InvalidSignal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::VisibilityState;

    #[test]
    fn parses_valid_line() {
        let signal = parse_signal(r#"{"type": "visibility", "state": "visible"}"#);
        assert_eq!(
            signal.unwrap(),
            HostSignal::Visibility {
                state: VisibilityState::Visible
            }
        );
    }

    #[test]
    fn skips_malformed_line() {
        assert!(matches!(parse_signal("not json"), Err(Error::InvalidSignal(_))));
        assert!(matches!(
            parse_signal(r#"{"type": "teleport"}"#),
            Err(Error::InvalidSignal(_))
        ));
    }
}
