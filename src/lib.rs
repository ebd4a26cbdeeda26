//! cartpulse - storefront telemetry agent.
//!
//! Buffers shopper behaviour into a durable per-page record, syncs it to a
//! remote collector, and asks a decision service whether to surface an
//! interstitial prompt, subject to a cooldown.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod host;
pub mod http;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
